//! Conduit Gateway
//!
//! - Catch-all HTTP endpoint routed by `Host` header
//! - Policy pipeline, then dispatch to the conduit's backend adapter
//! - Routing table refreshed in the background from the resource service

use std::net::SocketAddr;

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use conduit_gateway::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "conduit-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> conduit_core::Result<()> {
    let path = config::default_path();
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.gateway.listen.parse().map_err(|e| {
        conduit_core::ConduitError::UnprocessableEntity(format!("gateway.listen: {e}"))
    })?;

    let state = app_state::AppState::new(cfg)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = state.refresher().spawn(shutdown_rx);

    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "conduit-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| conduit_core::ConduitError::Internal(format!("failed to bind {listen}: {e}")))?;

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    })
    .await
    .map_err(|e| conduit_core::ConduitError::Internal(format!("server failed: {e}")));

    let _ = shutdown_tx.send(true);
    let _ = refresher.await;
    served
}
