//! Request parameter types shared by every transport.
//!
//! Defines the input schemas using `schemars` for the JSON Schema the MCP
//! protocol requires; the HTTP handlers deserialize the same types.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum accepted query or prompt size in bytes.
pub const MAX_PROMPT_BYTES: usize = 100_000;
/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;
/// Maximum number of search results.
pub const MAX_SEARCH_LIMIT: u32 = 50;

/// Parameters for the `search` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// What to search the web for.
    pub query: String,

    /// Maximum number of results (1-50, default 10).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Model override for the Gemini CLI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Run the CLI in its sandbox.
    #[serde(default)]
    pub sandbox: bool,

    /// Directory to run the CLI in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,

    /// Gemini API key; takes precedence over cached OAuth credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Parameters for the `chat` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatParams {
    /// Prompt sent to Gemini.
    pub prompt: String,

    /// Model override for the Gemini CLI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Run the CLI in its sandbox.
    #[serde(default)]
    pub sandbox: bool,

    /// Auto-approve every tool action the CLI wants to take.
    #[serde(default)]
    pub yolo: bool,

    /// Directory to run the CLI in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,

    /// Gemini API key; takes precedence over cached OAuth credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl SearchParams {
    /// Creates parameters for `query` with every option unset.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Result limit with the default applied.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }

    /// Checks every field.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("query", &self.query)?;
        if let Some(limit) = self.limit
            && !(1..=MAX_SEARCH_LIMIT).contains(&limit)
        {
            return Err(ValidationError::new(
                "limit",
                format!("must be between 1 and {MAX_SEARCH_LIMIT}, got {limit}"),
            ));
        }
        validate_common(
            self.model.as_deref(),
            self.working_directory.as_deref(),
            self.api_key.as_deref(),
        )
    }
}

impl ChatParams {
    /// Creates parameters for `prompt` with every option unset.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Checks every field.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("prompt", &self.prompt)?;
        validate_common(
            self.model.as_deref(),
            self.working_directory.as_deref(),
            self.api_key.as_deref(),
        )
    }
}

fn validate_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    if value.len() > MAX_PROMPT_BYTES {
        return Err(ValidationError::new(
            field,
            format!("exceeds {MAX_PROMPT_BYTES} bytes"),
        ));
    }
    Ok(())
}

fn validate_common(
    model: Option<&str>,
    working_directory: Option<&std::path::Path>,
    api_key: Option<&str>,
) -> Result<(), ValidationError> {
    if let Some(model) = model
        && model.trim().is_empty()
    {
        return Err(ValidationError::new("model", "must not be empty when set"));
    }
    if let Some(dir) = working_directory
        && !dir.is_dir()
    {
        return Err(ValidationError::new(
            "workingDirectory",
            format!("not a directory: {}", dir.display()),
        ));
    }
    if let Some(key) = api_key
        && key.trim().is_empty()
    {
        return Err(ValidationError::new("apiKey", "must not be empty when set"));
    }
    Ok(())
}
