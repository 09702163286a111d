//! External process runner - spawns tools and streams their output

use crate::collaborator::{CollaboratorError, OutputStream, ProcessOutputCallback};
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Number of trailing lines kept per stream for results and error reports
const OUTPUT_TAIL_LINES: usize = 20;

/// An external command line together with where to run it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
        }
    }

    /// Split a configured command line on whitespace.
    ///
    /// Returns `None` for a blank line. Quoting is not interpreted.
    pub fn parse(command_line: &str, cwd: impl Into<PathBuf>) -> Option<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program, cwd).args(parts))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for ProcessCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a successful process run.
///
/// Only the last lines of each stream are kept; the full output goes to the
/// line callback as it arrives.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external processes, one at a time, to completion
#[derive(Clone)]
pub struct ProcessRunner {
    callback: Option<Arc<dyn ProcessOutputCallback>>,
}

impl fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("streaming", &self.callback.is_some())
            .finish()
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self { callback: None }
    }

    /// Forward output lines to `callback` while processes run
    pub fn with_callback(mut self, callback: Arc<dyn ProcessOutputCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Run `command` and wait for it to exit.
    ///
    /// No timeout is applied: a hung tool blocks until it is killed.
    ///
    /// # Errors
    /// - `Spawn` if the program cannot be started (missing binary, bad cwd)
    /// - `ProcessFailed` if it exits non-zero or is killed by a signal; the
    ///   error carries the last lines of stderr
    pub async fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput, CollaboratorError> {
        debug!("Running `{}` in {}", command, command.cwd.display());

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CollaboratorError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CollaboratorError::Internal("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CollaboratorError::Internal("stderr was not captured".to_string()))?;

        let stdout_task = tokio::spawn(collect_tail(stdout, OutputStream::Stdout, self.callback.clone()));
        let stderr_task = tokio::spawn(collect_tail(stderr, OutputStream::Stderr, self.callback.clone()));

        let status = child
            .wait()
            .await
            .map_err(|e| CollaboratorError::io("Failed to wait for", &command.cwd, e))?;

        let stdout_tail = stdout_task.await.unwrap_or_default();
        let stderr_tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            warn!("`{}` exited with {:?}", command, status.code());
            return Err(CollaboratorError::ProcessFailed {
                command: command.to_string(),
                code: status.code(),
                stderr: join_lines(stderr_tail),
            });
        }

        debug!("`{}` finished", command);

        Ok(ProcessOutput {
            stdout: join_lines(stdout_tail),
            stderr: join_lines(stderr_tail),
        })
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Read `reader` to EOF, forwarding every line and keeping the last few.
///
/// Lines are decoded lossily so a stray non-UTF-8 byte never stops the read;
/// closing the pipe early would kill the child with SIGPIPE.
async fn collect_tail<R>(
    reader: R,
    stream: OutputStream,
    callback: Option<Arc<dyn ProcessOutputCallback>>,
) -> VecDeque<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut tail = VecDeque::with_capacity(OUTPUT_TAIL_LINES);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read {:?} of child process: {}", stream, e);
                break;
            }
        }

        let line = String::from_utf8_lossy(trim_line_ending(&buf)).into_owned();
        if let Some(callback) = &callback {
            callback.on_line(stream, &line);
        }
        if tail.len() == OUTPUT_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    tail
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn join_lines(lines: VecDeque<String>) -> String {
    Vec::from(lines).join("\n")
}
