//! Top-level facade crate for the conduit gateway.
//!
//! Re-exports the domain types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use conduit_core::*;
}

pub mod gateway {
    pub use conduit_gateway::*;
}
