//! CLI layer for gemini-bridge.
//!
//! Provides the command-line interface using clap: one-shot `search`,
//! `chat` and `exec`, plus the `serve` and `mcp stdio` servers.

pub mod commands;
pub mod parser;

pub use commands::execute;
pub use parser::{Cli, Commands, McpCommands};
