//! Transport layer (HTTP).
//!
//! A single catch-all handler turns any inbound request into an
//! `InboundRequest`, runs the policy pipeline, and writes the dispatcher's
//! answer or the uniform error body.

pub mod http;
