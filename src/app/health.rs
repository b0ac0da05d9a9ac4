//! Liveness surface: `GET /v1/health` returns the forwarder status as JSON.

use crate::domain::ForwarderError;
use crate::forwarder::{ForwarderStatus, StreamForwarder};
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub fn health_router(forwarder: Arc<StreamForwarder>) -> Router {
    Router::new()
        .route("/v1/health", get(health_handler))
        .with_state(forwarder)
}

/// 200 while events can still flow, 503 once the forwarder halted or stopped.
pub async fn health_handler(
    State(forwarder): State<Arc<StreamForwarder>>,
) -> (StatusCode, Json<ForwarderStatus>) {
    let status = forwarder.status();
    debug!(state = %status.state, "Health check requested");

    let code = if status.state.is_live() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

/// Serves the health router until `shutdown` is cancelled.
pub async fn serve_health(
    port: u16,
    forwarder: Arc<StreamForwarder>,
    shutdown: CancellationToken,
) -> Result<(), ForwarderError> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Health endpoint listening on {}", listener.local_addr()?);

    axum::serve(listener, health_router(forwarder))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
