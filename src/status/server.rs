use crate::status::api::{get_status, health, StatusState};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: Arc<StatusState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the status API until `shutdown` is cancelled
pub async fn start_server(
    listen_addr: SocketAddr,
    state: Arc<StatusState>,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(listen_addr).await?;
    serve(listener, state, shutdown).await
}

/// Serves on an already bound listener; lets callers bind port 0
pub async fn serve(
    listener: TcpListener,
    state: Arc<StatusState>,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    info!(addr = ?listener.local_addr().ok(), "Starting status HTTP server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
