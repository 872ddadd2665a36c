//! High-level worker lifecycle orchestration.
//!
//! [`Worker`] connects the resolver, argument rendering, process supervision,
//! readiness probing, stats retrieval, and diagnostics. The process handle
//! is acquired at launch and released by [`Worker::shutdown`] on every exit
//! path; every failure surfaced from here has already run full cleanup.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ConfigError, WorkerConfig};
use crate::diagnostics::{DiagnosticsSnapshot, Reporter};
use crate::resolver::{ExecutableResolver, ResolveError};
use crate::stats::{StatsClient, StatsError, StatsReport};
use crate::supervisor::capture::StreamCapture;
use crate::supervisor::probe::{ProbeSettings, ReadinessProbe, ReadinessResult};
use crate::supervisor::process::{SpawnError, StreamTails, WorkerProcess};

/// Default overall readiness budget.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default grace period before escalating terminate to kill.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Error type for harness operations.
#[derive(thiserror::Error, Debug)]
pub enum HarnessError {
    /// Invalid configuration, detected before spawn.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The worker binary could not be located.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The OS refused to spawn the worker.
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    /// The worker never became ready within the budget.
    #[error("worker failed to become ready within {timeout:?}")]
    ReadinessTimeout {
        timeout: Duration,
        stdout_tail: String,
        stderr_tail: String,
    },
    /// The worker exited before becoming ready.
    #[error("worker exited with code {exit_code:?} before becoming ready")]
    WorkerExited {
        exit_code: Option<i32>,
        stdout_tail: String,
        stderr_tail: String,
    },
    /// Stats retrieval failed.
    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Options controlling how a worker is launched and torn down.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Root of the per-target build output, used when `executable` is unset.
    pub build_root: PathBuf,
    /// Explicit executable path, bypassing resolution.
    pub executable: Option<PathBuf>,
    /// Worker binary name for resolution.
    pub binary_name: String,
    /// Capture stdout/stderr in background tasks.
    pub capture: bool,
    /// Overall readiness budget.
    pub ready_timeout: Duration,
    /// Terminate-to-kill grace period.
    pub grace: Duration,
    /// Probe tuning.
    pub probe: ProbeSettings,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            build_root: PathBuf::from("_build"),
            executable: None,
            binary_name: "media-worker".to_string(),
            capture: false,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            grace: DEFAULT_SHUTDOWN_GRACE,
            probe: ProbeSettings::default(),
        }
    }
}

/// A launched worker and everything needed to drive it.
#[derive(Debug)]
pub struct Worker {
    config: WorkerConfig,
    executable: PathBuf,
    process: WorkerProcess,
    capture: Option<StreamCapture>,
    probe: ReadinessProbe,
    stats_client: StatsClient,
    reporter: Reporter,
    last_stats: Option<Vec<StatsReport>>,
    ready: bool,
    ready_timeout: Duration,
    grace: Duration,
    tail_limit: usize,
}

impl Worker {
    /// Resolve the executable and spawn the worker.
    ///
    /// The caller must follow up with [`wait_ready`](Self::wait_ready);
    /// until [`shutdown`](Self::shutdown) runs, the spawned process is kept
    /// from leaking by the handle's kill-on-drop backstop.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError` if resolution or spawning fails. No process is
    /// left behind on failure.
    pub fn launch(config: WorkerConfig, options: LaunchOptions) -> Result<Self, HarnessError> {
        let executable = match options.executable {
            Some(path) => path,
            None => {
                ExecutableResolver::new(options.binary_name.as_str())
                    .resolve(&options.build_root)?
                    .path
            }
        };

        tracing::info!(command = %config.preview_command(&executable), "Launching worker");
        let args = config.to_args();
        let mut process = WorkerProcess::spawn(&executable, &args, options.capture)?;

        let capture = if options.capture {
            match (process.take_stdout(), process.take_stderr()) {
                (Some(stdout), Some(stderr)) => Some(StreamCapture::spawn(stdout, stderr)),
                _ => {
                    tracing::warn!("Worker streams unavailable, capture disabled");
                    None
                }
            }
        } else {
            None
        };

        let mut probe_settings = options.probe;
        probe_settings.host = config.http_host().to_string();
        let tail_limit = probe_settings.tail_limit;

        Ok(Self {
            stats_client: StatsClient::new(config.http_host()),
            probe: ReadinessProbe::new(probe_settings),
            config,
            executable,
            process,
            capture,
            reporter: Reporter::new(),
            last_stats: None,
            ready: false,
            ready_timeout: options.ready_timeout,
            grace: options.grace,
            tail_limit,
        })
    }

    /// Wait until the worker's stats endpoint is ready.
    ///
    /// With no `http_port` configured there is nothing to probe; only the
    /// bootstrap wait is honored and stats stay unavailable.
    ///
    /// # Errors
    ///
    /// Returns `ReadinessTimeout` or `WorkerExited` with the captured output
    /// tails. Full cleanup has already run when either is returned.
    pub async fn wait_ready(&mut self) -> Result<Duration, HarnessError> {
        let Some(port) = self.config.http_port() else {
            let wait = self.config.initial_wait();
            tracing::info!(?wait, "No HTTP port configured, waiting out bootstrap period");
            tokio::time::sleep(wait).await;
            return Ok(wait);
        };

        let result = self
            .probe
            .wait_ready(
                &mut self.process,
                port,
                self.ready_timeout,
                self.config.initial_wait(),
            )
            .await;

        match result {
            ReadinessResult::Success { elapsed } => {
                self.ready = true;
                Ok(elapsed)
            }
            ReadinessResult::Timeout { tails } => {
                self.shutdown().await;
                let tails = self.failure_tails(tails);
                Err(HarnessError::ReadinessTimeout {
                    timeout: self.ready_timeout,
                    stdout_tail: tails.stdout,
                    stderr_tail: tails.stderr,
                })
            }
            ReadinessResult::ProcessExited { exit_code, tails } => {
                self.shutdown().await;
                let tails = self.failure_tails(tails);
                Err(HarnessError::WorkerExited {
                    exit_code,
                    stdout_tail: tails.stdout,
                    stderr_tail: tails.stderr,
                })
            }
        }
    }

    /// With capture active the probe cannot see the streams; the captured
    /// logs are the authoritative tail source.
    fn failure_tails(&mut self, drained: StreamTails) -> StreamTails {
        match &mut self.capture {
            Some(capture) => capture.tails(self.tail_limit),
            None => drained,
        }
    }

    /// Fetch the current statistics array. Repeatable.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` unless [`wait_ready`](Self::wait_ready) succeeded,
    /// `WorkerCrashed` if the worker has exited, or `Unavailable` on network
    /// failure.
    pub async fn stats(&mut self) -> Result<Vec<StatsReport>, HarnessError> {
        let port = self.ready_port()?;
        let reports = self.stats_client.fetch(&mut self.process, port).await?;
        self.last_stats = Some(reports.clone());
        Ok(reports)
    }

    /// Retry stats retrieval until a non-empty array arrives.
    ///
    /// # Errors
    ///
    /// Same as [`stats`](Self::stats), plus `Exhausted` when every attempt
    /// returned an empty array.
    pub async fn wait_for_stats(
        &mut self,
        attempts: u32,
        delay: Duration,
    ) -> Result<Vec<StatsReport>, HarnessError> {
        let port = self.ready_port()?;
        let reports = self
            .stats_client
            .wait_for_stats(&mut self.process, port, attempts, delay)
            .await?;
        self.last_stats = Some(reports.clone());
        Ok(reports)
    }

    fn ready_port(&self) -> Result<u16, HarnessError> {
        if !self.ready {
            return Err(StatsError::NotReady.into());
        }
        self.config
            .http_port()
            .ok_or_else(|| StatsError::NotReady.into())
    }

    /// Produce a redacted diagnostics snapshot. Best-effort, callable at any
    /// time.
    pub fn snapshot(&mut self) -> DiagnosticsSnapshot {
        let summary = self.process.summary();
        self.reporter.snapshot(
            &self.config,
            Some(&self.executable),
            Some(summary),
            self.last_stats.as_deref(),
        )
    }

    /// Tear the worker down: terminate, wait out the grace period, kill if
    /// needed, and stop capture. Idempotent and infallible.
    pub async fn shutdown(&mut self) {
        self.process.shutdown(self.grace).await;
        if let Some(capture) = &mut self.capture {
            capture.stop().await;
        }
    }

    /// The launch configuration.
    #[must_use]
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// The resolved executable path.
    #[must_use]
    pub fn executable(&self) -> &std::path::Path {
        &self.executable
    }

    /// The worker's OS process id.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.process.id()
    }

    /// Whether the readiness probe has succeeded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Captured stream access (verbose mode only).
    pub fn capture(&mut self) -> Option<&mut StreamCapture> {
        self.capture.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_defaults() {
        let options = LaunchOptions::default();
        assert_eq!(options.build_root, PathBuf::from("_build"));
        assert_eq!(options.binary_name, "media-worker");
        assert!(!options.capture);
        assert_eq!(options.ready_timeout, DEFAULT_READY_TIMEOUT);
        assert_eq!(options.grace, DEFAULT_SHUTDOWN_GRACE);
    }

    #[test]
    fn test_launch_fails_before_spawn_when_binary_missing() {
        let config = WorkerConfig::builder("wss://x.example.com", "ch", crate::config::Role::Sendonly)
            .build()
            .unwrap();
        let options = LaunchOptions {
            build_root: PathBuf::from("/nonexistent/_build"),
            ..Default::default()
        };
        let err = Worker::launch(config, options).unwrap_err();
        assert!(matches!(err, HarnessError::Resolve(_)));
    }

    #[test]
    fn test_stats_error_converts() {
        let err: HarnessError = StatsError::NotReady.into();
        assert!(matches!(err, HarnessError::Stats(StatsError::NotReady)));
    }
}
