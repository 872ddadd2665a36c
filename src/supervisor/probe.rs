//! Readiness probing over the worker's HTTP stats endpoint.
//!
//! The probe polls `GET /stats` while watching process liveness, so a worker
//! that dies during startup is reported immediately instead of burning the
//! whole readiness budget on connection-refused retries.

use std::time::{Duration, Instant};

use crate::supervisor::process::{StreamTails, WorkerProcess};

/// Per-attempt HTTP timeout, independent of the overall readiness budget.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixed delay between polling attempts.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How many characters of each stream tail to keep for diagnostics.
const TAIL_LIMIT: usize = 2000;

/// Grace period for terminating a worker that never became ready.
const TIMEOUT_TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Budget for draining residual stream output during failure handling.
const DRAIN_BUDGET: Duration = Duration::from_secs(2);

/// Probe tuning knobs. The defaults are the fixed production policy: 1 s
/// retry interval, 5 s per-attempt timeout, no backoff growth or jitter.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Host the worker's stats endpoint binds to.
    pub host: String,
    /// Per-attempt HTTP timeout.
    pub attempt_timeout: Duration,
    /// Delay between attempts.
    pub poll_interval: Duration,
    /// Characters of stream tail kept on failure.
    pub tail_limit: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            host: crate::config::DEFAULT_HTTP_HOST.to_string(),
            attempt_timeout: ATTEMPT_TIMEOUT,
            poll_interval: POLL_INTERVAL,
            tail_limit: TAIL_LIMIT,
        }
    }
}

/// Terminal outcome of a readiness probe.
#[derive(Debug)]
pub enum ReadinessResult {
    /// The endpoint answered 200 within the budget.
    Success {
        /// Time from probe start (including the initial delay) to readiness.
        elapsed: Duration,
    },
    /// The budget elapsed without a successful response. The worker has been
    /// terminated and its residual output drained.
    Timeout { tails: StreamTails },
    /// The worker exited before becoming ready. `exit_code` is `None` when
    /// the process was killed by a signal.
    ProcessExited {
        exit_code: Option<i32>,
        tails: StreamTails,
    },
}

/// Polls the worker's stats endpoint until it serves, the worker dies, or
/// the budget runs out.
#[derive(Debug)]
pub struct ReadinessProbe {
    client: reqwest::Client,
    settings: ProbeSettings,
}

impl ReadinessProbe {
    /// Create a probe with the given settings.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be constructed, which only happens
    /// with an invalid TLS backend configuration.
    #[must_use]
    pub fn new(settings: ProbeSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(settings.attempt_timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self { client, settings }
    }

    /// Wait until the worker's stats endpoint is ready.
    ///
    /// Sleeps `initial_delay` first (bootstrap grace period), then loops
    /// until `timeout` elapses:
    ///
    /// 1. check liveness — an exited process returns immediately;
    /// 2. `GET /stats` with the short per-attempt timeout; 200 is success;
    /// 3. connection failures are swallowed, liveness is re-checked (the
    ///    worker may have died mid-request), then a fixed backoff.
    ///
    /// On `Timeout` the worker is terminated so its remaining output can be
    /// drained; on both failure outcomes the drained tails travel with the
    /// result so context is not lost once the caller proceeds to teardown.
    pub async fn wait_ready(
        &self,
        process: &mut WorkerProcess,
        port: u16,
        timeout: Duration,
        initial_delay: Duration,
    ) -> ReadinessResult {
        let started = Instant::now();

        if !initial_delay.is_zero() {
            tokio::time::sleep(initial_delay).await;
        }

        let url = format!("http://{}:{port}/stats", self.settings.host);
        tracing::info!(%url, ?timeout, "Waiting for worker readiness");

        let mut attempt: u32 = 0;
        while started.elapsed() < timeout {
            attempt += 1;

            if let Some(result) = self.check_exited(process).await {
                return result;
            }

            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    let elapsed = started.elapsed();
                    tracing::info!(?elapsed, attempt, "Worker is ready");
                    return ReadinessResult::Success { elapsed };
                }
                Ok(response) => {
                    tracing::debug!(status = %response.status(), attempt, "Worker not ready yet");
                }
                Err(e) => {
                    tracing::trace!(error = %e, attempt, "Readiness attempt failed");
                }
            }

            // The process may have died while the request was in flight;
            // catch that before sleeping out another interval.
            if let Some(result) = self.check_exited(process).await {
                return result;
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }

        tracing::warn!(?timeout, "Worker failed to become ready within budget");
        // Terminate before draining, so the streams reach end-of-file and the
        // residual output can be read without blocking. The handles stay open
        // for the caller's own shutdown.
        if let Err(e) = process.graceful_terminate(TIMEOUT_TERMINATE_GRACE).await {
            tracing::warn!(error = %e, "Cleanup failure while terminating unready worker");
        }
        let tails = process
            .drain_tails(self.settings.tail_limit, DRAIN_BUDGET)
            .await;
        ReadinessResult::Timeout { tails }
    }

    async fn check_exited(&self, process: &mut WorkerProcess) -> Option<ReadinessResult> {
        match process.try_wait() {
            Ok(Some(status)) => {
                let exit_code = status.code();
                tracing::warn!(?exit_code, "Worker exited before becoming ready");
                let tails = process
                    .drain_tails(self.settings.tail_limit, DRAIN_BUDGET)
                    .await;
                Some(ReadinessResult::ProcessExited { exit_code, tails })
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to query worker liveness");
                None
            }
        }
    }
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self::new(ProbeSettings::default())
    }
}
