//! Conduit gateway library entry.
//!
//! This crate wires the routing cache, policy pipeline, token service,
//! integration adapters, and HTTP transport into one gateway. It is consumed
//! by the binary (`main.rs`) and by integration tests.

pub mod adapters;
pub mod app_state;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod ops;
pub mod policy;
pub mod router;
pub mod routing;
pub mod token;
pub mod transport;
pub mod upstream;
