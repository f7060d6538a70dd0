//! CLI command implementations.
//!
//! Each command builds a [`GeminiService`] from the environment, runs on a
//! fresh Tokio runtime, and returns the text to print.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::parser::{Cli, Commands, McpCommands};
use crate::http::serve_http;
use crate::mcp::{GeminiMcpServer, serve_stdio};
use crate::process::StreamEvent;
use crate::service::{ChatParams, GeminiService, RunOverrides, SearchParams, ServiceConfig};

/// Executes the parsed command.
///
/// # Returns
///
/// Output to print on stdout; empty for servers and streamed chats.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let config = ServiceConfig::from_env();
    tracing::debug!(?config, "loaded configuration");
    let service = GeminiService::new(config);

    let rt = tokio::runtime::Runtime::new().context("failed to create async runtime")?;
    rt.block_on(dispatch(&cli.command, service))
}

async fn dispatch(command: &Commands, service: GeminiService) -> Result<String> {
    match command {
        Commands::Search {
            query,
            limit,
            model,
            sandbox,
            cwd,
        } => {
            let params = SearchParams {
                query: query.clone(),
                limit: Some(*limit),
                model: model.clone(),
                sandbox: *sandbox,
                working_directory: cwd.clone(),
                api_key: None,
            };
            Ok(service.search(&params).await?)
        }

        Commands::Chat {
            prompt,
            model,
            sandbox,
            yolo,
            cwd,
            stream,
        } => {
            let params = ChatParams {
                prompt: prompt.clone(),
                model: model.clone(),
                sandbox: *sandbox,
                yolo: *yolo,
                working_directory: cwd.clone(),
                api_key: None,
            };
            if *stream {
                cmd_chat_stream(&service, &params).await
            } else {
                Ok(service.chat(&params).await?)
            }
        }

        Commands::Exec {
            cwd,
            timeout_ms,
            args,
        } => cmd_exec(&service, cwd.as_deref(), *timeout_ms, args).await,

        Commands::Serve { host, port } => {
            serve_http(Arc::new(service), host, *port).await?;
            Ok(String::new())
        }

        Commands::Mcp(McpCommands::Stdio) => {
            serve_stdio(GeminiMcpServer::new(Arc::new(service))).await?;
            Ok(String::new())
        }
    }
}

async fn cmd_exec(
    service: &GeminiService,
    cwd: Option<&Path>,
    timeout_ms: Option<u64>,
    args: &[String],
) -> Result<String> {
    let overrides = RunOverrides {
        working_directory: cwd,
        api_key: None,
        timeout: timeout_ms.filter(|&ms| ms > 0).map(Duration::from_millis),
    };
    let output = service.run(args, overrides).await?;
    Ok(output.trim_end().to_string())
}

/// Copies the chat's stdout and stderr to ours as it arrives.
async fn cmd_chat_stream(service: &GeminiService, params: &ChatParams) -> Result<String> {
    let process = service.chat_stream(params)?;
    forward_events(process, tokio::io::stdout(), tokio::io::stderr()).await?;
    Ok(String::new())
}

/// Writes stream events to `out`/`err` and resolves to the terminal outcome.
async fn forward_events<S, O, E>(mut events: S, mut out: O, mut err: E) -> Result<()>
where
    S: futures_util::Stream<Item = StreamEvent> + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    use futures_util::StreamExt;

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Stdout(chunk) => {
                out.write_all(chunk.as_bytes()).await?;
                out.flush().await?;
            }
            StreamEvent::Stderr(chunk) => err.write_all(chunk.as_bytes()).await?,
            StreamEvent::Close { code: Some(0) } => return Ok(()),
            StreamEvent::Close { code } => {
                anyhow::bail!(
                    "gemini exited with {}",
                    code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"))
                );
            }
            StreamEvent::Error(e) => return Err(e.into()),
        }
    }
    anyhow::bail!("stream ended without an exit status")
}
