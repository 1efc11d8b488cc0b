//! Policy layer (allow list, method control, body shape, hidden fields).
//!
//! Runs every inbound request through an ordered, early-exit stage list
//! before anything is dispatched to a backend.

pub mod allowlist;
pub mod body;
pub mod engine;
pub mod hidden_field;

pub use engine::{PolicyDecision, PolicyPipeline, Stage, StageOutcome};
