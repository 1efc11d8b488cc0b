//! Dispatcher module exports.
//!
//! Re-exports the dispatcher so the transport and tests can depend on this
//! module directly.

pub mod dispatcher;

pub use dispatcher::Dispatcher;
