//! Worker process spawning and lifecycle control.
//!
//! [`WorkerProcess`] exclusively owns the spawned child: no other component
//! signals it or reads its streams directly. The handle is acquired at spawn
//! and unconditionally released by [`WorkerProcess::shutdown`]; `kill_on_drop`
//! backs that contract up if the owner unwinds without calling it.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

/// Error type for process spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The worker binary was not found.
    #[error("worker binary not found")]
    NotFound,
    /// Permission denied when spawning.
    #[error("permission denied")]
    PermissionDenied,
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(err),
        }
    }
}

/// Bounded tails of a process's output streams, for failure diagnostics.
#[derive(Debug, Clone, Default)]
pub struct StreamTails {
    pub stdout: String,
    pub stderr: String,
}

/// Point-in-time summary of the process for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessSummary {
    /// OS process id, if the process was ever started.
    pub pid: Option<u32>,
    /// Whether the process is still running.
    pub running: bool,
    /// Exit code, when exited normally. `None` while running or when
    /// terminated by a signal.
    pub exit_code: Option<i32>,
}

/// A running worker process.
#[derive(Debug)]
pub struct WorkerProcess {
    child: Child,
    pid: Option<u32>,
    exit: Option<ExitStatus>,
    stopped: bool,
}

impl WorkerProcess {
    /// Spawn the worker with the given argument vector.
    ///
    /// Stderr is always piped so failure tails can be recovered; stdout is
    /// piped only when `capture` is set, and discarded otherwise. The child
    /// is configured with `kill_on_drop` so a dropped handle can never leak
    /// a process.
    ///
    /// The caller must follow up with a readiness probe; the process runs
    /// asynchronously from this point until `shutdown`.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the binary is missing or the OS refuses to
    /// spawn.
    pub fn spawn(path: &Path, args: &[String], capture: bool) -> Result<Self, SpawnError> {
        let mut cmd = Command::new(path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if capture {
            cmd.stdout(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null());
        }

        let child = cmd.spawn().map_err(SpawnError::from_io)?;
        let pid = child.id();
        tracing::info!(?pid, path = %path.display(), "Spawned worker process");

        Ok(Self {
            child,
            pid,
            exit: None,
            stopped: false,
        })
    }

    /// Take ownership of the stdout handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take ownership of the stderr handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Get the process ID recorded at spawn.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Check if the process has exited without blocking.
    ///
    /// The exit status is cached once observed.
    ///
    /// # Errors
    ///
    /// Returns an error if the process state cannot be queried.
    pub fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        if let Some(status) = self.exit {
            return Ok(Some(status));
        }
        let status = self.child.try_wait()?;
        if let Some(status) = status {
            self.exit = Some(status);
        }
        Ok(status)
    }

    /// Wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        if let Some(status) = self.exit {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.exit = Some(status);
        Ok(status)
    }

    /// Forcefully kill the process and wait for it to be reaped.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    pub async fn kill(&mut self) -> std::io::Result<()> {
        self.child.kill().await?;
        if let Ok(Some(status)) = self.child.try_wait() {
            self.exit = Some(status);
        }
        Ok(())
    }

    /// Point-in-time summary for diagnostics. Best-effort: query failures
    /// report the process as not running.
    pub fn summary(&mut self) -> ProcessSummary {
        let status = self.try_wait().unwrap_or(self.exit);
        ProcessSummary {
            pid: self.pid,
            running: status.is_none() && !self.stopped,
            exit_code: status.and_then(|s| s.code()),
        }
    }

    /// Attempt graceful termination with a timeout.
    ///
    /// On Unix, sends SIGTERM first, then SIGKILL after the timeout. On
    /// other platforms, falls back to immediate kill.
    ///
    /// # Errors
    ///
    /// Returns an error if termination fails.
    pub async fn graceful_terminate(&mut self, timeout: Duration) -> std::io::Result<()> {
        if self.try_wait()?.is_some() {
            return Ok(());
        }

        self.send_terminate();

        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.exit = Some(status);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => self.kill().await,
        }
    }

    #[cfg(unix)]
    fn send_terminate(&self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.child.id() {
            let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
            let _ = kill(nix_pid, Signal::SIGTERM);
        }
    }

    #[cfg(not(unix))]
    fn send_terminate(&mut self) {
        let _ = self.child.start_kill();
    }

    /// Stop the process: terminate, wait up to `grace`, then kill and wait
    /// unconditionally. Stream handles are closed afterwards.
    ///
    /// Idempotent — calling on an already-stopped handle is a no-op — and
    /// infallible: teardown failures are logged, never propagated, so
    /// cleanup cannot mask an original failure.
    pub async fn shutdown(&mut self, grace: Duration) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        match self.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(pid = ?self.pid, code = ?status.code(), "Worker already exited");
                self.close_streams();
                return;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to query worker state during shutdown");
            }
        }

        tracing::info!(pid = ?self.pid, "Terminating worker process");
        self.send_terminate();

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.exit = Some(status);
                tracing::info!(pid = ?self.pid, code = ?status.code(), "Worker terminated gracefully");
            }
            Ok(Err(e)) => {
                tracing::warn!(pid = ?self.pid, error = %e, "Cleanup failure while waiting for worker");
            }
            Err(_) => {
                tracing::warn!(pid = ?self.pid, "Worker did not exit within grace period, killing");
                if let Err(e) = self.kill().await {
                    tracing::warn!(pid = ?self.pid, error = %e, "Cleanup failure while killing worker");
                }
            }
        }

        self.close_streams();
    }

    fn close_streams(&mut self) {
        drop(self.child.stdout.take());
        drop(self.child.stderr.take());
    }

    /// Read whatever remains of the output streams, bounded to the last
    /// `limit` characters of each.
    ///
    /// Reading is capped by `budget` per stream so an open pipe of a
    /// still-running process cannot stall teardown. Streams already handed
    /// off (to capture tasks) yield empty tails.
    pub async fn drain_tails(&mut self, limit: usize, budget: Duration) -> StreamTails {
        let stdout = drain_stream(self.child.stdout.take(), budget).await;
        let stderr = drain_stream(self.child.stderr.take(), budget).await;
        StreamTails {
            stdout: tail_chars(&stdout, limit),
            stderr: tail_chars(&stderr, limit),
        }
    }
}

async fn drain_stream<R: AsyncRead + Unpin>(stream: Option<R>, budget: Duration) -> String {
    let Some(mut stream) = stream else {
        return String::new();
    };
    let mut buf = Vec::new();
    match tokio::time::timeout(budget, stream.read_to_end(&mut buf)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "Failed to drain worker stream"),
        Err(_) => tracing::debug!("Timed out draining worker stream"),
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Last `limit` characters of `s`, on a char boundary.
pub(crate) fn tail_chars(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        return s.to_string();
    }
    let mut start = s.len() - limit;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_classification() {
        let not_found = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(matches!(SpawnError::from_io(not_found), SpawnError::NotFound));

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(
            SpawnError::from_io(denied),
            SpawnError::PermissionDenied
        ));

        let other = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        assert!(matches!(SpawnError::from_io(other), SpawnError::Io(_)));
    }

    #[test]
    fn test_spawn_missing_binary() {
        let err = WorkerProcess::spawn(Path::new("/nonexistent/media-worker"), &[], false)
            .unwrap_err();
        assert!(matches!(err, SpawnError::NotFound));
    }

    #[test]
    fn test_tail_chars() {
        assert_eq!(tail_chars("hello", 10), "hello");
        assert_eq!(tail_chars("hello world", 5), "world");
        assert_eq!(tail_chars("", 5), "");
        // Never splits a multi-byte character.
        let s = "aあいう";
        let tail = tail_chars(s, 4);
        assert!(s.ends_with(&tail));
    }
}
