//! HTTP transport: REST JSON endpoints, SSE streaming chat, and MCP over
//! streamable HTTP, all on one listener.

pub mod envelope;
pub mod routes;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::service::GeminiService;

pub use envelope::{ApiError, ErrorBody, status_for};
pub use routes::router;

/// Serves [`router`] on `host:port` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve_http(service: Arc<GeminiService>, host: &str, port: u16) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let app = router(service, &shutdown);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        "listening: REST under /api, MCP at /mcp"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
