//! Liveness HTTP endpoint for uptime pings.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Router serving `GET /` and `GET /health`.
pub fn router(port: u16) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .with_state(port)
}

/// Bind `host:port` and serve until `cancel` fires.
pub async fn serve(host: &str, port: u16, cancel: CancellationToken) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    info!("Liveness endpoint listening on http://{addr}/");

    axum::serve(listener, router(port))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

/// GET / — static alive string.
async fn root_handler(State(port): State<u16>) -> String {
    format!("Bot Telegram attivo! (Port: {port})")
}

/// GET /health — simple HTTP health check.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
