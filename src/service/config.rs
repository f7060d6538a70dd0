//! Bridge settings: CLI location, credentials, default model and directory,
//! and the per-operation timeouts.
//!
//! [`ServiceConfig::from_env`] reads the `GEMINI_*` variables on top of any
//! builder values; a variable that is unset, blank or unparsable keeps its
//! default.

use std::path::PathBuf;
use std::time::Duration;

use crate::process::MASKED_VALUE;

/// Default timeout for general operations in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
/// Default timeout for search in milliseconds.
pub const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 60_000;
/// Default timeout for chat in milliseconds.
pub const DEFAULT_CHAT_TIMEOUT_MS: u64 = 600_000;

/// General timeout override (milliseconds).
pub const ENV_TIMEOUT: &str = "GEMINI_TIMEOUT_MS";
/// Search timeout override (milliseconds).
pub const ENV_SEARCH_TIMEOUT: &str = "GEMINI_SEARCH_TIMEOUT_MS";
/// Chat timeout override (milliseconds).
pub const ENV_CHAT_TIMEOUT: &str = "GEMINI_CHAT_TIMEOUT_MS";
/// Default working directory override.
pub const ENV_DEFAULT_CWD: &str = "GEMINI_DEFAULT_CWD";
/// Default model.
pub const ENV_MODEL: &str = "GEMINI_MODEL";
/// Explicit path to the Gemini CLI.
pub const ENV_CLI_PATH: &str = "GEMINI_CLI_PATH";

/// Configuration for [`GeminiService`](super::GeminiService).
#[derive(Clone)]
pub struct ServiceConfig {
    /// Timeout for general operations.
    pub timeout: Duration,
    /// Timeout for search.
    pub search_timeout: Duration,
    /// Timeout for chat.
    pub chat_timeout: Duration,
    /// Directory used when a request names none.
    pub default_working_directory: Option<PathBuf>,
    /// API key used when a request carries none.
    pub api_key: Option<String>,
    /// Model used when a request names none.
    pub model: Option<String>,
    /// Explicit CLI executable, bypassing `PATH` lookup.
    pub cli_path: Option<PathBuf>,
}

impl ServiceConfig {
    /// Creates a new builder for `ServiceConfig`.
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::builder().from_env().build()
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("timeout", &self.timeout)
            .field("search_timeout", &self.search_timeout)
            .field("chat_timeout", &self.chat_timeout)
            .field("default_working_directory", &self.default_working_directory)
            .field("api_key", &self.api_key.as_ref().map(|_| MASKED_VALUE))
            .field("model", &self.model)
            .field("cli_path", &self.cli_path)
            .finish()
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    timeout: Option<Duration>,
    search_timeout: Option<Duration>,
    chat_timeout: Option<Duration>,
    default_working_directory: Option<PathBuf>,
    api_key: Option<String>,
    model: Option<String>,
    cli_path: Option<PathBuf>,
}

impl ServiceConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(self) -> Self {
        self.from_lookup(|name| std::env::var(name).ok())
    }

    /// Populates unset fields from `lookup`.
    #[must_use]
    pub fn from_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.timeout.is_none() {
            self.timeout = parse_timeout(ENV_TIMEOUT, lookup(ENV_TIMEOUT));
        }
        if self.search_timeout.is_none() {
            self.search_timeout = parse_timeout(ENV_SEARCH_TIMEOUT, lookup(ENV_SEARCH_TIMEOUT));
        }
        if self.chat_timeout.is_none() {
            self.chat_timeout = parse_timeout(ENV_CHAT_TIMEOUT, lookup(ENV_CHAT_TIMEOUT));
        }
        if self.default_working_directory.is_none() {
            self.default_working_directory = non_empty(lookup(ENV_DEFAULT_CWD)).map(PathBuf::from);
        }
        if self.api_key.is_none() {
            self.api_key = non_empty(lookup(crate::gemini::API_KEY_ENV));
        }
        if self.model.is_none() {
            self.model = non_empty(lookup(ENV_MODEL));
        }
        if self.cli_path.is_none() {
            self.cli_path = non_empty(lookup(ENV_CLI_PATH)).map(PathBuf::from);
        }
        self
    }

    /// Sets the general timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the search timeout.
    #[must_use]
    pub const fn search_timeout(mut self, duration: Duration) -> Self {
        self.search_timeout = Some(duration);
        self
    }

    /// Sets the chat timeout.
    #[must_use]
    pub const fn chat_timeout(mut self, duration: Duration) -> Self {
        self.chat_timeout = Some(duration);
        self
    }

    /// Sets the default working directory.
    #[must_use]
    pub fn default_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_working_directory = Some(dir.into());
        self
    }

    /// Sets the default API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the default model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the CLI executable path.
    #[must_use]
    pub fn cli_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cli_path = Some(path.into());
        self
    }

    /// Builds the [`ServiceConfig`].
    #[must_use]
    pub fn build(self) -> ServiceConfig {
        ServiceConfig {
            timeout: self
                .timeout
                .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
            search_timeout: self
                .search_timeout
                .unwrap_or(Duration::from_millis(DEFAULT_SEARCH_TIMEOUT_MS)),
            chat_timeout: self
                .chat_timeout
                .unwrap_or(Duration::from_millis(DEFAULT_CHAT_TIMEOUT_MS)),
            default_working_directory: self.default_working_directory,
            api_key: self.api_key,
            model: self.model,
            cli_path: self.cli_path,
        }
    }
}

/// Parses a positive millisecond count; anything else falls back to the default.
fn parse_timeout(name: &str, value: Option<String>) -> Option<Duration> {
    let value = value?;
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            tracing::warn!(name, value = %value, "ignoring invalid timeout, using default");
            None
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
