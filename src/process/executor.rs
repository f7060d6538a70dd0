//! Subprocess execution with timeout, output collection and cleanup.
//!
//! Both modes share one driver task per execution. The driver owns the
//! child, reads stdout and stderr as they arrive, watches the deadline and
//! the cancellation token, and publishes [`StreamEvent`]s. It sends exactly
//! one terminal event (`Close` or `Error`) and then drops its sender.
//!
//! Exit is observed as soon as it happens; pipes still held open by a
//! background descendant get [`PIPE_DRAIN`] before `Close` is sent anyway.
//! A cancelled process that ignores SIGTERM is killed after the kill grace.
//!
//! ```text
//! spawn_for_streaming ──► driver task ──► StreamEvent channel ──► consumer
//!                           │   ▲
//!              SIGTERM/kill │   │ cancel (terminate / drop)
//!                           ▼   │
//!                          child process
//! ```
//!
//! [`ProcessExecutor::execute_with_timeout`] is a consumer that accumulates
//! the events into a single result.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures_util::Stream;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, trace, warn};

use super::command::CliCommand;
use super::env::{EnvOverrides, masked_overrides, masked_snapshot, merge_environment};
use super::profile::CliProfile;
use super::stderr::{LineBuffer, StderrLine, Utf8Decoder, classify_line};
use crate::error::ExecError;

/// Read buffer size per pipe.
const READ_BUF_SIZE: usize = 8192;
/// Time a terminated process gets to exit before it is killed outright.
const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);
/// How long output is still read after the process itself has exited.
pub const PIPE_DRAIN: Duration = Duration::from_millis(250);

/// Per-call execution options.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Directory the child runs in, used verbatim.
    pub working_directory: PathBuf,
    /// Caller overrides, applied after the profile's fixed overrides.
    pub env: EnvOverrides,
    /// Deadline measured from spawn.
    pub timeout: Duration,
}

impl ExecOptions {
    /// Creates options with no environment overrides.
    pub fn new(working_directory: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            working_directory: working_directory.into(),
            env: EnvOverrides::new(),
            timeout,
        }
    }

    /// Replaces the caller overrides.
    #[must_use]
    pub fn with_env(mut self, env: EnvOverrides) -> Self {
        self.env = env;
        self
    }
}

/// Live output of a streaming execution.
#[derive(Debug)]
pub enum StreamEvent {
    /// Decoded stdout chunk, in arrival order.
    Stdout(String),
    /// Decoded stderr chunk, in arrival order.
    Stderr(String),
    /// The process exited and its pipes closed. Terminal.
    Close {
        /// Exit code, or `None` when ended by a signal.
        code: Option<i32>,
    },
    /// The execution failed. Terminal.
    ///
    /// A timeout carries the stderr seen so far; its `stdout` is empty since
    /// every stdout chunk was already delivered as an event.
    Error(ExecError),
}

impl StreamEvent {
    /// Event name used on the wire.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Stdout(_) => "stdout",
            Self::Stderr(_) => "stderr",
            Self::Close { .. } => "close",
            Self::Error(_) => "error",
        }
    }

    /// Whether this is the last event of the execution.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Close { .. } | Self::Error(_))
    }
}

/// Handle to a running streaming execution.
///
/// Yields [`StreamEvent`]s through [`StreamingProcess::next_event`] or as a
/// [`Stream`]. Dropping the handle terminates the process.
pub struct StreamingProcess {
    program: String,
    pid: Option<u32>,
    events: mpsc::UnboundedReceiver<StreamEvent>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl StreamingProcess {
    /// Program being run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// OS process id at spawn time.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Waits for the next event; `None` after the terminal event.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Requests termination of the process.
    ///
    /// Sends SIGTERM and disarms the deadline; the process is killed if it is
    /// still running after the kill grace. Idempotent, and a no-op once the
    /// process has exited. The stream still ends with its terminal event.
    pub fn terminate(&self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for StreamingProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingProcess")
            .field("program", &self.program)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl Stream for StreamingProcess {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_recv(cx)
    }
}

/// Runs CLI commands as subprocesses.
///
/// Cheap to clone; holds no per-call state.
#[derive(Clone)]
pub struct ProcessExecutor {
    profile: Arc<dyn CliProfile>,
    kill_grace: Duration,
}

impl ProcessExecutor {
    /// Creates an executor using `profile` for stderr classification and
    /// fixed environment overrides.
    pub fn new(profile: Arc<dyn CliProfile>) -> Self {
        Self {
            profile,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    /// Sets how long a timed-out or terminated process may take to exit
    /// after the termination signal before it is killed.
    #[must_use]
    pub const fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// Profile in use.
    #[must_use]
    pub fn profile(&self) -> &dyn CliProfile {
        self.profile.as_ref()
    }

    /// Runs `command` with `extra_args` to completion and returns its stdout.
    ///
    /// # Errors
    ///
    /// - [`ExecError::Spawn`] if the process cannot be started.
    /// - [`ExecError::Exit`] on a non-zero exit, with full stdout and stderr.
    /// - [`ExecError::Timeout`] when the deadline passes, with the output
    ///   collected so far. Reported as soon as termination is requested.
    pub async fn execute_with_timeout(
        &self,
        command: &CliCommand,
        extra_args: &[String],
        options: &ExecOptions,
    ) -> Result<String, ExecError> {
        let mut process = self.spawn_for_streaming(command, extra_args, options)?;
        let mut stdout = String::new();
        let mut stderr = String::new();

        while let Some(event) = process.next_event().await {
            match event {
                StreamEvent::Stdout(chunk) => stdout.push_str(&chunk),
                StreamEvent::Stderr(chunk) => stderr.push_str(&chunk),
                StreamEvent::Close { code: Some(0) } => return Ok(stdout),
                StreamEvent::Close { code } => {
                    return Err(ExecError::Exit {
                        program: process.program().to_string(),
                        code,
                        stdout,
                        stderr,
                    });
                }
                StreamEvent::Error(ExecError::Timeout {
                    program,
                    timeout,
                    elapsed,
                    ..
                }) => {
                    return Err(ExecError::Timeout {
                        program,
                        timeout,
                        elapsed,
                        stdout,
                        stderr,
                    });
                }
                StreamEvent::Error(e) => return Err(e),
            }
        }

        Err(ExecError::Spawn {
            program: process.program().to_string(),
            source: std::io::Error::other("process driver stopped without an outcome"),
        })
    }

    /// Spawns `command` with `extra_args` and returns immediately.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Spawn`] if the process cannot be started. Every
    /// later failure is delivered as a terminal [`StreamEvent::Error`].
    pub fn spawn_for_streaming(
        &self,
        command: &CliCommand,
        extra_args: &[String],
        options: &ExecOptions,
    ) -> Result<StreamingProcess, ExecError> {
        let program = command.program_name();
        let args = command.args_with(extra_args);

        let mut overrides = self.profile.fixed_environment();
        overrides.extend(&options.env);
        let env = merge_environment(std::env::vars_os(), &overrides);

        info!(
            tool = self.profile.name(),
            program = %program,
            args = ?args,
            cwd = %options.working_directory.display(),
            timeout_ms = options.timeout.as_millis(),
            "spawning process"
        );
        debug!(overrides = ?masked_overrides(&overrides), "environment overrides");
        trace!(env = ?masked_snapshot(&env), "child environment");

        let started = Instant::now();
        let mut child = spawn_child(command, &args, options, &env).map_err(|source| {
            error!(program = %program, error = %source, "failed to spawn process");
            ExecError::Spawn {
                program: program.clone(),
                source,
            }
        })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ExecError::Spawn {
                program,
                source: std::io::Error::other("child pipes were not captured"),
            });
        };

        let pid = child.id();
        let (tx, events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let driver = Driver {
            child,
            program: program.clone(),
            profile: Arc::clone(&self.profile),
            tx,
            cancel: cancel.clone(),
            started,
            timeout: options.timeout,
            kill_grace: self.kill_grace,
        };
        tokio::spawn(driver.run(stdout, stderr));

        Ok(StreamingProcess {
            program,
            pid,
            events,
            _guard: cancel.clone().drop_guard(),
            cancel,
        })
    }
}

impl std::fmt::Debug for ProcessExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessExecutor")
            .field("profile", &self.profile.name())
            .field("kill_grace", &self.kill_grace)
            .finish()
    }
}

fn spawn_child(
    command: &CliCommand,
    args: &[String],
    options: &ExecOptions,
    env: &BTreeMap<OsString, OsString>,
) -> std::io::Result<Child> {
    tokio::process::Command::new(&command.program)
        .args(args)
        .current_dir(&options.working_directory)
        .env_clear()
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

/// Owns one child for the lifetime of one execution.
struct Driver {
    child: Child,
    program: String,
    profile: Arc<dyn CliProfile>,
    tx: mpsc::UnboundedSender<StreamEvent>,
    cancel: CancellationToken,
    started: Instant,
    timeout: Duration,
    kill_grace: Duration,
}

impl Driver {
    async fn run(mut self, mut stdout: ChildStdout, mut stderr: ChildStderr) {
        let deadline = time::sleep(self.timeout.saturating_sub(self.started.elapsed()));
        let kill_timer = time::sleep(self.kill_grace);
        let drain = time::sleep(PIPE_DRAIN);
        tokio::pin!(deadline, kill_timer, drain);

        let mut out_buf = vec![0u8; READ_BUF_SIZE];
        let mut err_buf = vec![0u8; READ_BUF_SIZE];
        let mut out_open = true;
        let mut err_open = true;
        let mut out_decoder = Utf8Decoder::default();
        let mut err_decoder = Utf8Decoder::default();
        let mut err_lines = LineBuffer::default();
        let mut err_seen = String::new();
        let mut exited: Option<ExitStatus> = None;
        let mut terminating = false;
        let mut killed = false;

        let terminal = loop {
            tokio::select! {
                read = stdout.read(&mut out_buf), if out_open => {
                    let chunk = match read {
                        Ok(0) => {
                            out_open = false;
                            out_decoder.finish()
                        }
                        Ok(n) => out_decoder.decode(&out_buf[..n]),
                        Err(e) => {
                            warn!(program = %self.program, error = %e, "stdout read failed");
                            out_open = false;
                            out_decoder.finish()
                        }
                    };
                    if !chunk.is_empty() {
                        debug!(program = %self.program, bytes = chunk.len(), chunk = %chunk, "stdout");
                        self.emit(StreamEvent::Stdout(chunk));
                    }
                }
                read = stderr.read(&mut err_buf), if err_open => {
                    let chunk = match read {
                        Ok(0) => {
                            err_open = false;
                            err_decoder.finish()
                        }
                        Ok(n) => err_decoder.decode(&err_buf[..n]),
                        Err(e) => {
                            warn!(program = %self.program, error = %e, "stderr read failed");
                            err_open = false;
                            err_decoder.finish()
                        }
                    };
                    if !chunk.is_empty() {
                        for line in err_lines.push(&chunk) {
                            self.log_stderr_line(&line);
                        }
                        err_seen.push_str(&chunk);
                        self.emit(StreamEvent::Stderr(chunk));
                    }
                }
                status = self.child.wait(), if exited.is_none() => {
                    match status {
                        Ok(status) => {
                            info!(program = %self.program, code = ?status.code(), "process exited");
                            exited = Some(status);
                            drain.as_mut().reset(time::Instant::now() + PIPE_DRAIN);
                        }
                        Err(source) => {
                            error!(program = %self.program, error = %source, "failed to wait for process");
                            break StreamEvent::Error(ExecError::Spawn {
                                program: self.program.clone(),
                                source,
                            });
                        }
                    }
                }
                () = &mut drain, if exited.is_some() => {
                    debug!(program = %self.program, "output still open after exit, closing");
                    break StreamEvent::Close {
                        code: exited.and_then(|status| status.code()),
                    };
                }
                () = &mut deadline, if exited.is_none() && !terminating => {
                    warn!(
                        program = %self.program,
                        timeout_ms = self.timeout.as_millis(),
                        "process timed out, terminating"
                    );
                    request_termination(&mut self.child, &self.program);
                    break StreamEvent::Error(ExecError::Timeout {
                        program: self.program.clone(),
                        timeout: self.timeout,
                        elapsed: self.started.elapsed(),
                        stdout: String::new(),
                        stderr: std::mem::take(&mut err_seen),
                    });
                }
                () = self.cancel.cancelled(), if exited.is_none() && !terminating => {
                    info!(program = %self.program, "termination requested");
                    terminating = true;
                    request_termination(&mut self.child, &self.program);
                    kill_timer.as_mut().reset(time::Instant::now() + self.kill_grace);
                }
                () = &mut kill_timer, if terminating && !killed && exited.is_none() => {
                    warn!(
                        program = %self.program,
                        grace_ms = self.kill_grace.as_millis(),
                        "process ignored termination, killing"
                    );
                    killed = true;
                    if let Err(e) = self.child.start_kill() {
                        warn!(program = %self.program, error = %e, "kill failed");
                    }
                }
            }

            if let Some(status) = exited
                && !out_open
                && !err_open
            {
                break StreamEvent::Close {
                    code: status.code(),
                };
            }
        };

        if let Some(line) = err_lines.finish() {
            self.log_stderr_line(&line);
        }

        let timed_out = matches!(terminal, StreamEvent::Error(ExecError::Timeout { .. }));
        self.emit(terminal);

        let Self {
            mut child,
            program,
            tx,
            kill_grace,
            ..
        } = self;
        drop(tx);

        if timed_out {
            drop(stdout);
            drop(stderr);
            reap(&mut child, &program, kill_grace).await;
        }
    }

    fn emit(&self, event: StreamEvent) {
        if self.tx.send(event).is_err() {
            trace!(program = %self.program, "event dropped, consumer gone");
        }
    }

    fn log_stderr_line(&self, line: &str) {
        match classify_line(self.profile.as_ref(), line) {
            StderrLine::Blank => {}
            StderrLine::Informational => debug!(program = %self.program, line, "stderr notice"),
            StderrLine::Error => warn!(program = %self.program, line, "stderr"),
        }
    }
}

/// Sends the graceful termination signal. No-op once the child is reaped.
fn request_termination(child: &mut Child, program: &str) {
    let Some(pid) = child.id() else {
        return;
    };

    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return;
        };
        debug!(program, pid, "sending SIGTERM");
        if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
            debug!(program, pid, error = ?e, "SIGTERM failed");
        }
    }

    #[cfg(not(unix))]
    {
        debug!(program, pid, "killing process");
        if let Err(e) = child.start_kill() {
            debug!(program, pid, error = %e, "kill failed");
        }
    }
}

/// Waits for a terminated child, killing it if it outlives `grace`.
async fn reap(child: &mut Child, program: &str, grace: Duration) {
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            debug!(program, code = ?status.code(), "process exited after termination");
        }
        Ok(Err(e)) => warn!(program, error = %e, "wait failed after termination"),
        Err(_) => {
            warn!(program, grace_ms = grace.as_millis(), "process ignored termination, killing");
            if let Err(e) = child.kill().await {
                warn!(program, error = %e, "kill failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kinds() {
        assert_eq!(StreamEvent::Stdout("a".into()).kind(), "stdout");
        assert_eq!(StreamEvent::Stderr("a".into()).kind(), "stderr");
        assert_eq!(StreamEvent::Close { code: Some(0) }.kind(), "close");
        assert!(StreamEvent::Close { code: None }.is_terminal());
        assert!(!StreamEvent::Stdout(String::new()).is_terminal());
    }

    #[test]
    fn test_options_builder() {
        let options = ExecOptions::new("/tmp", Duration::from_secs(1))
            .with_env(EnvOverrides::new().set("A", "1"));
        assert_eq!(options.timeout, Duration::from_secs(1));
        assert!(!options.env.is_empty());
    }
}
