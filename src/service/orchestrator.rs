//! Orchestration of search and chat requests.
//!
//! Validates parameters, resolves the CLI once, builds arguments, picks the
//! working directory, timeout and environment, and hands the call to the
//! [`ProcessExecutor`].

use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::debug;

use super::config::ServiceConfig;
use super::output::format_search_output;
use super::params::{ChatParams, SearchParams};
use crate::error::Result;
use crate::gemini::{
    API_KEY_ENV, GeminiProfile, build_chat_args, build_search_args, resolve_gemini_command,
};
use crate::process::{
    CliCommand, EnvOverrides, ExecOptions, ProcessExecutor, StreamingProcess,
    resolve_working_directory,
};

/// Per-call settings for [`GeminiService::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOverrides<'a> {
    /// Directory to run in.
    pub working_directory: Option<&'a Path>,
    /// API key for this call.
    pub api_key: Option<&'a str>,
    /// Timeout replacing the general default.
    pub timeout: Option<Duration>,
}

/// Runs search and chat requests against the Gemini CLI.
///
/// The CLI location is resolved on first use and kept for the lifetime of
/// the service. Concurrent calls share only that value.
pub struct GeminiService {
    config: ServiceConfig,
    executor: ProcessExecutor,
    command: OnceLock<CliCommand>,
}

impl GeminiService {
    /// Creates a service that resolves the CLI lazily.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            executor: ProcessExecutor::new(Arc::new(GeminiProfile)),
            command: OnceLock::new(),
        }
    }

    /// Creates a service with an already-resolved command.
    pub fn with_command(config: ServiceConfig, command: CliCommand) -> Self {
        let service = Self::new(config);
        let _ = service.command.set(command);
        service
    }

    /// Replaces the executor.
    #[must_use]
    pub fn with_executor(mut self, executor: ProcessExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The CLI invocation, resolving it on first call.
    pub fn command(&self) -> &CliCommand {
        self.command
            .get_or_init(|| resolve_gemini_command(self.config.cli_path.as_deref()))
    }

    /// Runs a web search and returns the results, pretty-printed when they
    /// are JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] for bad parameters and
    /// [`crate::Error::Exec`] when the CLI fails.
    pub async fn search(&self, params: &SearchParams) -> Result<String> {
        params.validate()?;
        let args = build_search_args(params, self.config.model.as_deref());
        let options = self.options(
            self.config.search_timeout,
            params.working_directory.as_deref(),
            params.api_key.as_deref(),
        )?;

        let raw = self
            .executor
            .execute_with_timeout(self.command(), &args, &options)
            .await?;
        debug!(bytes = raw.len(), "search completed");
        Ok(format_search_output(&raw))
    }

    /// Sends a prompt and returns the reply.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] for bad parameters and
    /// [`crate::Error::Exec`] when the CLI fails.
    pub async fn chat(&self, params: &ChatParams) -> Result<String> {
        params.validate()?;
        let args = build_chat_args(params, self.config.model.as_deref());
        let options = self.options(
            self.config.chat_timeout,
            params.working_directory.as_deref(),
            params.api_key.as_deref(),
        )?;

        let raw = self
            .executor
            .execute_with_timeout(self.command(), &args, &options)
            .await?;
        debug!(bytes = raw.len(), "chat completed");
        Ok(raw.trim_end().to_string())
    }

    /// Starts a chat whose output is delivered as it is produced.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] for bad parameters and
    /// [`crate::Error::Exec`] if the CLI cannot be spawned.
    pub fn chat_stream(&self, params: &ChatParams) -> Result<StreamingProcess> {
        params.validate()?;
        let args = build_chat_args(params, self.config.model.as_deref());
        let options = self.options(
            self.config.chat_timeout,
            params.working_directory.as_deref(),
            params.api_key.as_deref(),
        )?;

        Ok(self
            .executor
            .spawn_for_streaming(self.command(), &args, &options)?)
    }

    /// Runs the CLI with raw arguments under the general timeout.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Exec`] when the CLI fails.
    pub async fn run(&self, args: &[String], overrides: RunOverrides<'_>) -> Result<String> {
        let options = self.options(
            overrides.timeout.unwrap_or(self.config.timeout),
            overrides.working_directory,
            overrides.api_key,
        )?;
        Ok(self
            .executor
            .execute_with_timeout(self.command(), args, &options)
            .await?)
    }

    fn options(
        &self,
        timeout: Duration,
        working_directory: Option<&Path>,
        api_key: Option<&str>,
    ) -> Result<ExecOptions> {
        let dir = resolve_working_directory(
            working_directory,
            self.config.default_working_directory.as_deref(),
        )?;

        let mut env = EnvOverrides::new();
        if let Some(key) = api_key.or(self.config.api_key.as_deref()) {
            env = env.set(API_KEY_ENV, key);
        }

        Ok(ExecOptions::new(dir, timeout).with_env(env))
    }
}

impl std::fmt::Debug for GeminiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiService")
            .field("config", &self.config)
            .field("executor", &self.executor)
            .field("command", &self.command.get())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::{Error, ExecError};

    /// Service whose "CLI" is a shell script; request arguments arrive as `$@`.
    fn scripted(script: &str, config: ServiceConfig) -> GeminiService {
        GeminiService::with_command(
            config,
            CliCommand::new("/bin/sh", ["-c", script, "gemini"]),
        )
    }

    #[tokio::test]
    async fn test_chat_passes_prompt_and_trims() {
        let service = scripted(r#"printf '%s|' "$@"; printf '\n\n'"#, ServiceConfig::default());
        let reply = service.chat(&ChatParams::new("hello world")).await.unwrap();
        assert_eq!(reply, "--prompt|hello world|");
    }

    #[tokio::test]
    async fn test_default_model_from_config() {
        let config = ServiceConfig::builder().model("gemini-2.5-flash").build();
        let service = scripted(r#"printf '%s ' "$@""#, config);
        let reply = service.chat(&ChatParams::new("hi")).await.unwrap();
        assert_eq!(reply, "--prompt hi --model gemini-2.5-flash");
    }

    #[tokio::test]
    async fn test_request_api_key_wins() {
        let config = ServiceConfig::builder().api_key("from-config").build();
        let service = scripted(r#"printf '%s' "$GEMINI_API_KEY""#, config);

        let mut params = ChatParams::new("hi");
        params.api_key = Some("secret123".to_string());
        assert_eq!(service.chat(&params).await.unwrap(), "secret123");

        let reply = service.chat(&ChatParams::new("hi")).await.unwrap();
        assert_eq!(reply, "from-config");
    }

    #[tokio::test]
    async fn test_search_output_is_reformatted() {
        let service = scripted(
            r#"printf 'Sure:\n```json\n[{"title":"Rust","url":"https://rust-lang.org","snippet":"s"}]\n```\n'"#,
            ServiceConfig::default(),
        );
        let result = service.search(&SearchParams::new("rust")).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(value[0]["title"], "Rust");
        assert!(result.contains("\n  {"));
    }

    #[tokio::test]
    async fn test_working_directory_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let service = scripted("pwd", ServiceConfig::default());
        let mut params = ChatParams::new("hi");
        params.working_directory = Some(dir.path().to_path_buf());
        let reply = service.chat(&params).await.unwrap();
        assert_eq!(
            std::fs::canonicalize(reply).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_validation_happens_before_spawn() {
        let service = GeminiService::with_command(
            ServiceConfig::default(),
            CliCommand::new("/definitely/not/a/cli", Vec::<String>::new()),
        );
        let err = service.chat(&ChatParams::new("")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_cli_failure_surfaces_stderr() {
        let service = scripted("echo 'quota exceeded' >&2; exit 3", ServiceConfig::default());
        let err = service.chat(&ChatParams::new("hi")).await.unwrap_err();
        match err {
            Error::Exec(ExecError::Exit { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "quota exceeded\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_chat_timeout_from_config() {
        let config = ServiceConfig::builder()
            .chat_timeout(Duration::from_millis(50))
            .build();
        let service = scripted("sleep 5", config);
        let err = service.chat(&ChatParams::new("hi")).await.unwrap_err();
        assert_eq!(err.kind(), "timeout");
    }

    #[tokio::test]
    async fn test_run_with_raw_arguments() {
        let service = scripted(r#"printf '%s' "$1""#, ServiceConfig::default());
        let out = service
            .run(&["--version".to_string()], RunOverrides::default())
            .await
            .unwrap();
        assert_eq!(out, "--version");
    }

    #[tokio::test]
    async fn test_chat_stream_delivers_output() {
        let service = scripted("printf streamed", ServiceConfig::default());
        let mut process = service.chat_stream(&ChatParams::new("hi")).unwrap();
        let mut out = String::new();
        while let Some(event) = process.next_event().await {
            match event {
                crate::process::StreamEvent::Stdout(chunk) => out.push_str(&chunk),
                crate::process::StreamEvent::Close { code } => assert_eq!(code, Some(0)),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(out, "streamed");
    }

    #[test]
    fn test_command_is_cached() {
        let service = GeminiService::new(
            ServiceConfig::builder().cli_path("/opt/gemini").build(),
        );
        let first: *const CliCommand = service.command();
        let second: *const CliCommand = service.command();
        assert_eq!(first, second);
        assert_eq!(service.command().program, std::path::PathBuf::from("/opt/gemini"));
    }
}
