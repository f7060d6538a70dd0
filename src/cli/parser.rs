//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::service::params::DEFAULT_SEARCH_LIMIT;

/// Gemini bridge: search and chat backed by the Gemini CLI, served over MCP
/// and HTTP or run once from the shell.
///
/// Configuration comes from `GEMINI_*` environment variables
/// (`GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_CLI_PATH`, `GEMINI_DEFAULT_CWD`,
/// `GEMINI_TIMEOUT_MS`, `GEMINI_SEARCH_TIMEOUT_MS`, `GEMINI_CHAT_TIMEOUT_MS`).
#[derive(Parser, Debug)]
#[command(name = "gemini-bridge")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging (otherwise `RUST_LOG`, default `info`).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the web through Gemini and print the results as JSON.
    #[command(after_help = r#"Examples:
  gemini-bridge search "rust async runtimes"
  gemini-bridge search "tokio select" --limit 3 --model gemini-2.5-flash
"#)]
    Search {
        /// Search query text.
        query: String,

        /// Maximum number of results (1-50).
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,

        /// Model to use.
        #[arg(short, long)]
        model: Option<String>,

        /// Run tools inside the CLI's sandbox.
        #[arg(long)]
        sandbox: bool,

        /// Working directory for the CLI.
        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// Send a prompt to Gemini and print the reply.
    #[command(after_help = r#"Examples:
  gemini-bridge chat "Explain Rust lifetimes briefly"
  gemini-bridge chat "Refactor main.rs" --cwd ./project --yolo --stream
"#)]
    Chat {
        /// Prompt text.
        prompt: String,

        /// Model to use.
        #[arg(short, long)]
        model: Option<String>,

        /// Run tools inside the CLI's sandbox.
        #[arg(long)]
        sandbox: bool,

        /// Auto-approve every tool action.
        #[arg(long)]
        yolo: bool,

        /// Working directory for the CLI.
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Print output as it arrives.
        #[arg(long)]
        stream: bool,
    },

    /// Run the Gemini CLI with raw arguments under the general timeout.
    #[command(after_help = r#"Examples:
  gemini-bridge exec -- --version
  gemini-bridge exec --timeout-ms 5000 -- --prompt "hi"
"#)]
    Exec {
        /// Working directory for the CLI.
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Timeout in milliseconds, replacing `GEMINI_TIMEOUT_MS`.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Arguments passed to the CLI verbatim.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },

    /// Serve the REST/SSE API and MCP over HTTP.
    #[command(after_help = r#"Examples:
  gemini-bridge serve                          # Listen on 127.0.0.1:3000
  gemini-bridge serve --host 0.0.0.0 --port 8080
"#)]
    Serve {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1", env = "GEMINI_BRIDGE_HOST")]
        host: String,

        /// Port to bind to.
        #[arg(long, default_value = "3000", env = "GEMINI_BRIDGE_PORT")]
        port: u16,
    },

    /// MCP server commands.
    #[command(subcommand)]
    Mcp(McpCommands),
}

/// MCP server subcommands.
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start the MCP server with stdio transport.
    ///
    /// Reads JSON-RPC messages from stdin, writes responses to stdout.
    #[command(after_help = r#"Examples:
  gemini-bridge mcp stdio
  GEMINI_API_KEY=... gemini-bridge mcp stdio
"#)]
    Stdio,
}
