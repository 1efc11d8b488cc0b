//! Per-request context types shared across layers.
//!
//! The transport builds an `InboundRequest`; the policy pipeline resolves it
//! into a `RequestContext` that stages mutate in place.

pub mod request;

pub use request::{InboundRequest, RequestContext};
