//! MCP transports: stdio and streamable HTTP.

use std::sync::Arc;

use rmcp::ServiceExt;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use tokio_util::sync::CancellationToken;

use super::server::GeminiMcpServer;
use crate::service::GeminiService;

/// Starts the MCP server on stdin/stdout.
///
/// Stdout carries protocol messages only; logs go to stderr.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters a runtime error.
pub async fn serve_stdio(server: GeminiMcpServer) -> anyhow::Result<()> {
    tracing::info!("serving MCP over stdio");
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

/// Builds the streamable HTTP MCP service, ready to be mounted at `/mcp`.
///
/// Every session gets its own [`GeminiMcpServer`] sharing `service`.
/// Cancelling `shutdown` closes open sessions.
pub fn streamable_http_service(
    service: Arc<GeminiService>,
    shutdown: &CancellationToken,
) -> StreamableHttpService<GeminiMcpServer, LocalSessionManager> {
    StreamableHttpService::new(
        move || Ok(GeminiMcpServer::new(Arc::clone(&service))),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            cancellation_token: shutdown.child_token(),
            ..Default::default()
        },
    )
}
