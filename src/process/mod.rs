//! Launching one test executable and streaming its output into the hub.

pub mod lines;

pub use lines::LineSplitter;

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::ProcessError;
use crate::hub::LogHub;

/// Exit code reported when the executable could not be launched or awaited.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

const READ_CHUNK: usize = 8192;

/// Runs executables and merges their stdout and stderr into a [`LogHub`].
///
/// Holds no state besides the hub; cloning is cheap.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    hub: Arc<LogHub>,
}

impl ProcessRunner {
    pub fn new(hub: Arc<LogHub>) -> Self {
        Self { hub }
    }

    /// Run `executable` with whitespace-split `arguments` in `working_dir`.
    ///
    /// Every line the child writes to either stream is printed to the hub as
    /// one message, in the order that stream produced it. Returns only after
    /// the child has exited and both streams are fully drained, so all of the
    /// child's output is in the hub before the exit code is visible.
    ///
    /// Launch failures are printed to the hub and reported as
    /// [`SPAWN_FAILURE_EXIT_CODE`].
    pub async fn run(&self, executable: &Path, arguments: &str, working_dir: &Path) -> i32 {
        match self.try_run(executable, arguments, working_dir).await {
            Ok(code) => code,
            Err(err) => {
                warn!(executable = %executable.display(), error = %err, "process launch failed");
                self.hub.print(err.to_string());
                SPAWN_FAILURE_EXIT_CODE
            }
        }
    }

    async fn try_run(
        &self,
        executable: &Path,
        arguments: &str,
        working_dir: &Path,
    ) -> Result<i32, ProcessError> {
        let mut child = Command::new(executable)
            .args(split_arguments(arguments))
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                path: executable.to_path_buf(),
                source,
            })?;

        let pid = child.id().unwrap_or(0);
        debug!(pid, executable = %executable.display(), arguments, "process spawned");

        let stdout = child.stdout.take().ok_or(ProcessError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(ProcessError::MissingPipe("stderr"))?;

        let stdout_task = tokio::spawn(drain(stdout, Arc::clone(&self.hub)));
        let stderr_task = tokio::spawn(drain(stderr, Arc::clone(&self.hub)));

        let status = child.wait().await;

        // Join barrier: both drains finish before the exit code is returned,
        // whether or not the wait succeeded.
        let (stdout_lines, stderr_lines) = tokio::join!(stdout_task, stderr_task);
        let stdout_lines = joined_line_count("stdout", stdout_lines);
        let stderr_lines = joined_line_count("stderr", stderr_lines);

        let code = exit_code(status.map_err(ProcessError::Wait)?);
        debug!(pid, code, stdout_lines, stderr_lines, "process finished");
        Ok(code)
    }
}

/// Split an argument string the way a plain exec does: on whitespace, no
/// quoting and no shell.
pub fn split_arguments(arguments: &str) -> impl Iterator<Item = &str> {
    arguments.split_whitespace()
}

/// Map an exit status to a single integer: the exit code, or `128 + signal`
/// for a child killed by a signal.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    SPAWN_FAILURE_EXIT_CODE
}

async fn drain<R>(mut reader: R, hub: Arc<LogHub>) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut count = 0;

    let ended = loop {
        let read = match reader.read(&mut chunk).await {
            Ok(0) => break Ok(()),
            Ok(read) => read,
            Err(err) => break Err(err),
        };
        for line in splitter.feed(&chunk[..read]) {
            hub.print(&line);
            count += 1;
        }
    };
    // A trailing fragment is delivered even when the stream broke off.
    if let Some(line) = splitter.finish() {
        hub.print(&line);
        count += 1;
    }
    ended.map(|()| count)
}

fn joined_line_count(
    stream: &str,
    joined: Result<std::io::Result<usize>, tokio::task::JoinError>,
) -> usize {
    match joined {
        Ok(Ok(count)) => count,
        Ok(Err(err)) => {
            warn!(stream, error = %err, "reading child output failed");
            0
        }
        Err(err) => {
            warn!(stream, error = %err, "output drain task failed");
            0
        }
    }
}
