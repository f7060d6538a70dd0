//! # gemini-bridge
//!
//! Exposes web search and chat backed by the Gemini CLI to MCP clients
//! (stdio or streamable HTTP) and plain HTTP clients (JSON or SSE).
//!
//! The core is [`process::ProcessExecutor`], which runs the CLI as a
//! subprocess with a deadline, either collecting its output or streaming
//! it as events, and always cleans up the child.
//!
//! ```text
//! mcp / http / cli
//!   ↓
//! service::GeminiService (validate, build args, cwd, env, timeout)
//!   ↓
//! process::ProcessExecutor ── gemini::GeminiProfile
//!   ↓
//! gemini CLI subprocess
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use gemini_bridge::service::{ChatParams, GeminiService, ServiceConfig};
//!
//! # async fn demo() -> gemini_bridge::Result<()> {
//! let service = GeminiService::new(ServiceConfig::from_env());
//! let reply = service.chat(&ChatParams::new("Summarize RFC 9110 in one line")).await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod error;
pub mod gemini;
pub mod http;
pub mod mcp;
pub mod process;
pub mod service;

pub use error::{ConfigError, Error, ExecError, Result, ValidationError};
pub use process::{ProcessExecutor, StreamEvent, StreamingProcess};
pub use service::{ChatParams, GeminiService, SearchParams, ServiceConfig};
