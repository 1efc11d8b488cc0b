//! Axum router wiring.
//!
//! Ops endpoints are matched first on every host and for every method;
//! everything else falls through to the conduit handler.

use axum::{routing::any, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", any(ops::healthz))
        .route("/readyz", any(ops::readyz))
        .fallback(transport::http::handle)
        .with_state(state)
}
