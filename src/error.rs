//! Error types for gemini-bridge.
//!
//! Each layer has its own error enum. [`ExecError`] is the executor's
//! taxonomy and the only one that carries captured subprocess output.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, Error)]
pub enum Error {
    /// The wrapped CLI could not be run to a successful completion.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// A request failed validation before reaching the executor.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O failure outside of subprocess management.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable identifier for the error kind, used by transports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Exec(e) => e.kind(),
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

/// Terminal failure of a single subprocess execution.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The subprocess could not be created, or the OS failed while managing it.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Executable that was being launched.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The subprocess ran and exited unsuccessfully.
    #[error("{program} exited with {}: {}", describe_exit(.code), .stderr.trim_end())]
    Exit {
        /// Executable that was run.
        program: String,
        /// Exit code, or `None` when terminated by a signal.
        code: Option<i32>,
        /// Full captured stdout.
        stdout: String,
        /// Full captured stderr, verbatim.
        stderr: String,
    },

    /// The subprocess did not finish before the deadline and was terminated.
    #[error("{program} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// Executable that was run.
        program: String,
        /// Configured deadline.
        timeout: Duration,
        /// Time between spawn and expiry.
        elapsed: Duration,
        /// Stdout captured before expiry.
        stdout: String,
        /// Stderr captured before expiry.
        stderr: String,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"))
}

impl ExecError {
    /// Stable identifier for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "spawn",
            Self::Exit { .. } => "exit",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Exit code for [`ExecError::Exit`].
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { code, .. } => *code,
            _ => None,
        }
    }

    /// Captured stderr, if any was collected.
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Exit { stderr, .. } | Self::Timeout { stderr, .. } => Some(stderr),
            Self::Spawn { .. } => None,
        }
    }

    /// Captured stdout, if any was collected.
    #[must_use]
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::Exit { stdout, .. } | Self::Timeout { stdout, .. } => Some(stdout),
            Self::Spawn { .. } => None,
        }
    }
}

/// A request parameter failed validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid `{field}`: {message}")]
pub struct ValidationError {
    /// Offending parameter name.
    pub field: &'static str,
    /// Human-readable reason.
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error for `field`.
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configured default working directory is unusable.
    #[error("default working directory does not exist: {}", .path.display())]
    MissingDirectory {
        /// Configured path.
        path: PathBuf,
    },

    /// The current directory could not be determined.
    #[error("cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_error_preserves_stderr() {
        let err = ExecError::Exit {
            program: "gemini".to_string(),
            code: Some(2),
            stdout: String::new(),
            stderr: "boom\n".to_string(),
        };
        assert_eq!(err.to_string(), "gemini exited with code 2: boom");
        assert_eq!(err.stderr(), Some("boom\n"));
        assert_eq!(err.exit_code(), Some(2));
        assert_eq!(err.kind(), "exit");
    }

    #[test]
    fn test_signal_exit_display() {
        let err = ExecError::Exit {
            program: "gemini".to_string(),
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(err.to_string().contains("a signal"));
    }

    #[test]
    fn test_timeout_display() {
        let err = ExecError::Timeout {
            program: "gemini".to_string(),
            timeout: Duration::from_millis(50),
            elapsed: Duration::from_millis(51),
            stdout: "partial".to_string(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "gemini timed out after 50ms");
        assert_eq!(err.stdout(), Some("partial"));
    }

    #[test]
    fn test_kind_through_top_level() {
        let err: Error = ValidationError::new("query", "must not be empty").into();
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.to_string(), "invalid `query`: must not be empty");

        let err: Error = ExecError::Spawn {
            program: "gemini".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();
        assert_eq!(err.kind(), "spawn");
    }
}
