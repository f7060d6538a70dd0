//! Process execution core.
//!
//! Spawns the wrapped CLI, enforces a deadline, collects or streams its
//! output, classifies stderr, and guarantees cleanup on every exit path.
//!
//! # Architecture
//!
//! ```text
//! CliCommand + extra args + ExecOptions
//!   ↓
//! ProcessExecutor (profile: Arc<dyn CliProfile>)
//!   ├── merge env (inherited → profile fixed → caller)
//!   ├── spawn child (stdin closed, stdout/stderr piped)
//!   └── driver task ── StreamEvent ──┬── execute_with_timeout → Result<String, ExecError>
//!                                    └── StreamingProcess → caller's sink
//! ```

pub mod command;
pub mod env;
pub mod executor;
pub mod profile;
pub mod stderr;

pub use command::{CliCommand, resolve_command};
pub use env::{EnvOverrides, MASKED_VALUE, merge_environment, resolve_working_directory};
pub use executor::{ExecOptions, ProcessExecutor, StreamEvent, StreamingProcess};
pub use profile::{CliProfile, PlainProfile};
pub use stderr::{StderrLine, classify_line};
