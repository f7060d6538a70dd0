//! Pluggable per-tool behavior for the executor.
//!
//! The spawn/timeout/cleanup machinery in [`ProcessExecutor`] is shared by
//! every wrapped CLI. What differs per tool is captured here.
//!
//! [`ProcessExecutor`]: super::ProcessExecutor

use super::env::EnvOverrides;

/// Tool-specific policy consulted by the executor.
pub trait CliProfile: Send + Sync {
    /// Tool name for logging.
    fn name(&self) -> &'static str;

    /// Whether a non-empty stderr line is a status notice rather than an error.
    ///
    /// The default treats every line as an error.
    fn is_informational(&self, line: &str) -> bool {
        let _ = line;
        false
    }

    /// Overrides applied before the caller's, on every spawn.
    fn fixed_environment(&self) -> EnvOverrides {
        EnvOverrides::new()
    }
}

/// Profile with no tool-specific behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainProfile;

impl CliProfile for PlainProfile {
    fn name(&self) -> &'static str {
        "cli"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_profile_defaults() {
        let profile = PlainProfile;
        assert_eq!(profile.name(), "cli");
        assert!(!profile.is_informational("[auth] Loaded cached credentials."));
        assert!(profile.fixed_environment().is_empty());
    }
}
