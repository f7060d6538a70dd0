//! MCP (Model Context Protocol) server.
//!
//! Exposes `search` and `chat` as MCP tools over stdio or streamable HTTP.
//!
//! # Architecture
//!
//! ```text
//! MCP Client
//!   ↓ tools/call search | chat
//! GeminiMcpServer
//!   ↓
//! GeminiService (validate → args → cwd/env/timeout)
//!   ↓
//! ProcessExecutor::execute_with_timeout → gemini CLI
//!   ↓
//! CallToolResult (text, or is_error with the CLI's message)
//! ```

pub mod server;
pub mod transport;

pub use server::GeminiMcpServer;
pub use transport::{serve_stdio, streamable_http_service};
