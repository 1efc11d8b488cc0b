//! Conduit core: transport-agnostic domain types and the shared error surface.
//!
//! This crate defines the conduit snapshot held by the gateway, access tokens,
//! and the error taxonomy shared by the routing cache, policy pipeline, token
//! service, and integration adapters. It carries no runtime or HTTP
//! dependencies so it can be reused by tooling and tests.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `ConduitError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod model;

// Error surface shared by every crate.
pub use error::{ClientCode, ConduitError, Result};
