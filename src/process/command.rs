//! Resolved CLI invocation and the resolver that produces it.

use std::path::{Path, PathBuf};

/// Executable plus the arguments that precede every request-specific argument.
///
/// Produced once by [`resolve_command`] and treated as read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    /// Path (or bare name) of the executable.
    pub program: PathBuf,
    /// Arguments always passed before the extra arguments of a call.
    pub base_args: Vec<String>,
}

impl CliCommand {
    /// Creates a command from a program and its base arguments.
    pub fn new<P, I, S>(program: P, base_args: I) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            base_args: base_args.into_iter().map(Into::into).collect(),
        }
    }

    /// Program name for logs and error messages.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Base arguments followed by `extra`, in order.
    #[must_use]
    pub fn args_with(&self, extra: &[String]) -> Vec<String> {
        self.base_args.iter().chain(extra).cloned().collect()
    }
}

/// Resolves how to invoke a CLI.
///
/// Order: explicit override, then `binary` on `PATH`, then `fallback`
/// (typically a package-runner invocation such as `npx -y <package>`).
pub fn resolve_command(
    explicit: Option<&Path>,
    binary: &str,
    fallback: impl FnOnce() -> CliCommand,
) -> CliCommand {
    if let Some(path) = explicit {
        tracing::debug!(path = %path.display(), "using configured CLI path");
        return CliCommand::new(path, Vec::<String>::new());
    }

    match which::which(binary) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "found {binary} on PATH");
            CliCommand::new(path, Vec::<String>::new())
        }
        Err(e) => {
            let command = fallback();
            tracing::info!(
                error = %e,
                program = %command.program_name(),
                args = ?command.base_args,
                "{binary} not on PATH, using fallback invocation"
            );
            command
        }
    }
}
