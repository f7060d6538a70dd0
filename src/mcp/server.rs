//! MCP server exposing `search` and `chat` tools.
//!
//! Each tool call is handed to the shared [`GeminiService`]. Executor
//! failures come back as tool errors carrying the CLI's own message;
//! malformed requests are rejected as invalid parameters.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};

use crate::error::Error;
use crate::service::{ChatParams, GeminiService, SearchParams};

/// Gemini bridge MCP server.
#[derive(Clone)]
pub struct GeminiMcpServer {
    tool_router: ToolRouter<Self>,
    service: Arc<GeminiService>,
}

#[tool_router]
impl GeminiMcpServer {
    /// Web search through the Gemini CLI.
    #[tool(
        name = "search",
        description = "Search the web using Gemini's Google Search tool. Returns a JSON array of results with title, url and snippet. Optional: limit (1-50, default 10), model, sandbox, workingDirectory, apiKey."
    )]
    async fn search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.service.search(&params).await)
    }

    /// Single-turn chat with the Gemini CLI.
    #[tool(
        name = "chat",
        description = "Send a prompt to Gemini and return its reply. Optional: model, sandbox (run tools in a sandbox), yolo (auto-approve tool actions), workingDirectory, apiKey."
    )]
    async fn chat(
        &self,
        Parameters(params): Parameters<ChatParams>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.service.chat(&params).await)
    }
}

#[tool_handler]
impl ServerHandler for GeminiMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                title: Some("Gemini Bridge MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Gemini bridge: use `search` for web search results and `chat` for \
                 open-ended prompts. Both run the Gemini CLI locally."
                    .to_string(),
            ),
        }
    }
}

impl GeminiMcpServer {
    /// Creates a server backed by `service`.
    pub fn new(service: Arc<GeminiService>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service,
        }
    }

    /// Shared service.
    #[must_use]
    pub fn service(&self) -> &Arc<GeminiService> {
        &self.service
    }
}

/// Maps a service outcome to the MCP result model.
fn tool_result(outcome: crate::Result<String>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(Error::Validation(e)) => Err(McpError::invalid_params(e.to_string(), None)),
        Err(Error::Exec(e)) => {
            tracing::warn!(kind = e.kind(), error = %e, "tool call failed");
            Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
        }
        Err(e) => Err(McpError::internal_error(e.to_string(), None)),
    }
}
