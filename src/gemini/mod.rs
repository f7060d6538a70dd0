//! Gemini CLI specifics.
//!
//! Everything the generic [`crate::process`] core needs to know about the
//! wrapped `gemini` tool: how to find it, how to read its stderr, which
//! environment it must not see, and how requests become arguments.

pub mod args;

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::process::{CliCommand, CliProfile, EnvOverrides, resolve_command};

pub use args::{build_chat_args, build_search_args, search_prompt};

/// Executable name looked up on `PATH`.
pub const GEMINI_BINARY: &str = "gemini";
/// npm package run through `npx` when the binary is not installed.
pub const GEMINI_PACKAGE: &str = "@google/gemini-cli";
/// Variable the CLI reads its API key from.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Variables that make the CLI attach to an IDE companion and pick up its
/// credentials. Always removed from the child environment.
const IDE_DETECTION_VARS: [&str; 2] = ["GEMINI_CLI_IDE_SERVER_PORT", "TERM_PROGRAM"];

/// Credential-cache notices, e.g. `[auth] Loaded cached credentials.`
static INFORMATIONAL_STDERR: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\[.*?\] (?:Loaded|Using|Authenticated)")
        .map_err(|e| tracing::error!(error = %e, "invalid stderr pattern"))
        .ok()
});

/// [`CliProfile`] for the Gemini CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiProfile;

impl CliProfile for GeminiProfile {
    fn name(&self) -> &'static str {
        GEMINI_BINARY
    }

    fn is_informational(&self, line: &str) -> bool {
        INFORMATIONAL_STDERR
            .as_ref()
            .is_some_and(|re| re.is_match(line.trim_start()))
    }

    fn fixed_environment(&self) -> EnvOverrides {
        IDE_DETECTION_VARS
            .iter()
            .fold(EnvOverrides::new(), |env, var| env.unset(*var))
    }
}

/// Locates the Gemini CLI: `explicit`, then `gemini` on `PATH`, then
/// `npx -y @google/gemini-cli`.
pub fn resolve_gemini_command(explicit: Option<&Path>) -> CliCommand {
    resolve_command(explicit, GEMINI_BINARY, || {
        CliCommand::new("npx", ["-y", GEMINI_PACKAGE])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{StderrLine, classify_line};
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("[auth] Loaded cached credentials." ; "loaded")]
    #[test_case("[oauth] Using cached token" ; "using")]
    #[test_case("[INFO] Authenticated via OAuth" ; "authenticated")]
    #[test_case("[] Loaded" ; "empty tag")]
    #[test_case("  [auth] Loaded cached credentials." ; "leading whitespace")]
    fn test_informational_lines(line: &str) {
        assert_eq!(classify_line(&GeminiProfile, line), StderrLine::Informational);
    }

    #[test_case("Error: quota exceeded" ; "plain error")]
    #[test_case("Loaded cached credentials." ; "no tag")]
    #[test_case("[auth] loaded cached credentials." ; "lowercase verb")]
    #[test_case("[auth] Failed to load credentials" ; "other verb")]
    #[test_case("[auth]Loaded" ; "missing space")]
    #[test_case("warning [auth] Loaded" ; "tag not at start")]
    fn test_error_lines(line: &str) {
        assert_eq!(classify_line(&GeminiProfile, line), StderrLine::Error);
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(classify_line(&GeminiProfile, ""), StderrLine::Blank);
        assert_eq!(classify_line(&GeminiProfile, " \t"), StderrLine::Blank);
    }

    proptest! {
        #[test]
        fn prop_tagged_status_is_informational(
            tag in "[^\n]{0,20}",
            verb in prop::sample::select(vec!["Loaded", "Using", "Authenticated"]),
            rest in "[^\n]{0,40}",
        ) {
            let line = format!("[{tag}] {verb}{rest}");
            prop_assert_eq!(classify_line(&GeminiProfile, &line), StderrLine::Informational);
        }

        #[test]
        fn prop_untagged_text_is_error(line in "[a-zA-Z0-9:][^\n]{0,60}") {
            prop_assert_eq!(classify_line(&GeminiProfile, &line), StderrLine::Error);
        }
    }

    #[test]
    fn test_fixed_environment_removes_ide_vars() {
        let env = GeminiProfile.fixed_environment();
        let entries: Vec<_> = env.iter().collect();
        assert_eq!(
            entries,
            vec![("GEMINI_CLI_IDE_SERVER_PORT", None), ("TERM_PROGRAM", None)]
        );
    }

    #[test]
    fn test_explicit_cli_path() {
        let command = resolve_gemini_command(Some(Path::new("/usr/local/bin/gemini")));
        assert_eq!(command, CliCommand::new("/usr/local/bin/gemini", Vec::<String>::new()));
    }
}
