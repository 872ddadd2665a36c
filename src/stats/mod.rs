//! Retrieval of the worker's runtime statistics.
//!
//! The payload is a JSON array of report objects, passed through unmodified.
//! Each report is minimally tagged with a `type` discriminator; nothing else
//! is interpreted here.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::supervisor::WorkerProcess;

/// Overall request timeout for stats retrieval.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Characters of stderr tail attached to crash reports.
const TAIL_LIMIT: usize = 2000;

/// Budget for draining residual stream output after a crash.
const DRAIN_BUDGET: Duration = Duration::from_secs(2);

/// Error type for stats retrieval.
#[derive(thiserror::Error, Debug)]
pub enum StatsError {
    /// The readiness probe never reported success.
    #[error("worker is not ready")]
    NotReady,
    /// The worker process has exited.
    #[error("worker crashed (exit code {exit_code:?})")]
    WorkerCrashed {
        exit_code: Option<i32>,
        stderr_tail: String,
    },
    /// Network failure distinct from a crash.
    #[error("stats endpoint unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),
    /// The response body was not a JSON array.
    #[error("failed to decode stats payload: {0}")]
    Decode(#[from] serde_json::Error),
    /// No non-empty stats within the retry budget.
    #[error("no stats retrieved after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// One opaque statistics report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsReport(Value);

impl StatsReport {
    /// Wrap a raw report value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The `type` discriminator, if the report carries one.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// The raw report value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the raw value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Filter reports by their `type` discriminator.
pub fn reports_of_kind<'a>(
    reports: &'a [StatsReport],
    kind: &'a str,
) -> impl Iterator<Item = &'a StatsReport> + 'a {
    reports.iter().filter(move |r| r.kind() == Some(kind))
}

/// HTTP client for the worker's stats endpoint.
#[derive(Debug, Clone)]
pub struct StatsClient {
    client: reqwest::Client,
    host: String,
}

impl StatsClient {
    /// Create a client targeting the given host.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be constructed, which only happens
    /// with an invalid TLS backend configuration.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            host: host.into(),
        }
    }

    /// Fetch the current statistics array.
    ///
    /// Checks process liveness first so a crashed worker is reported as
    /// `WorkerCrashed` with its stderr tail rather than as a connection
    /// error; liveness is re-checked after a transport failure for the same
    /// reason.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` on crash, transport failure, or a payload that
    /// is not a JSON array.
    pub async fn fetch(
        &self,
        process: &mut WorkerProcess,
        port: u16,
    ) -> Result<Vec<StatsReport>, StatsError> {
        if let Some(err) = check_crashed(process).await {
            return Err(err);
        }

        let url = format!("http://{}:{port}/stats", self.host);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                if let Some(err) = check_crashed(process).await {
                    return Err(err);
                }
                return Err(StatsError::Unavailable(e));
            }
        };

        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => {
                if let Some(err) = check_crashed(process).await {
                    return Err(err);
                }
                return Err(StatsError::Unavailable(e));
            }
        };

        let body = response.bytes().await.map_err(StatsError::Unavailable)?;
        let reports: Vec<Value> = serde_json::from_slice(&body)?;
        tracing::debug!(entries = reports.len(), "Fetched worker stats");
        Ok(reports.into_iter().map(StatsReport::new).collect())
    }

    /// Retry [`fetch`](Self::fetch) until a non-empty array arrives.
    ///
    /// # Errors
    ///
    /// Returns the last fetch error, or `Exhausted` if every attempt
    /// returned an empty array.
    pub async fn wait_for_stats(
        &self,
        process: &mut WorkerProcess,
        port: u16,
        attempts: u32,
        delay: Duration,
    ) -> Result<Vec<StatsReport>, StatsError> {
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.fetch(process, port).await {
                Ok(reports) if !reports.is_empty() => {
                    tracing::debug!(attempt, "Stats retrieved");
                    return Ok(reports);
                }
                Ok(_) => {
                    tracing::debug!(attempt, "Stats list is empty");
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "Stats attempt failed");
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or(StatsError::Exhausted { attempts }))
    }
}

async fn check_crashed(process: &mut WorkerProcess) -> Option<StatsError> {
    match process.try_wait() {
        Ok(Some(status)) => {
            let tails = process.drain_tails(TAIL_LIMIT, DRAIN_BUDGET).await;
            Some(StatsError::WorkerCrashed {
                exit_code: status.code(),
                stderr_tail: tails.stderr,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(value: Value) -> StatsReport {
        StatsReport::new(value)
    }

    #[test]
    fn test_kind_reads_type_discriminator() {
        let r = report(json!({"type": "outbound-rtp", "packetsSent": 10}));
        assert_eq!(r.kind(), Some("outbound-rtp"));

        let untagged = report(json!({"packetsSent": 10}));
        assert_eq!(untagged.kind(), None);
    }

    #[test]
    fn test_reports_of_kind_filters_by_tag_only() {
        let reports = vec![
            report(json!({"type": "codec", "mimeType": "video/VP8"})),
            report(json!({"type": "transport", "dtlsState": "connected"})),
            report(json!({"type": "codec", "mimeType": "audio/opus"})),
        ];
        let codecs: Vec<_> = reports_of_kind(&reports, "codec").collect();
        assert_eq!(codecs.len(), 2);
        assert!(reports_of_kind(&reports, "inbound-rtp").next().is_none());
    }

    #[test]
    fn test_payload_passes_through_unmodified() {
        let raw = json!({"type": "codec", "unknownField": {"deep": [1, 2, 3]}});
        let r = report(raw.clone());
        assert_eq!(r.into_value(), raw);
    }

    #[test]
    fn test_decode_requires_array() {
        let err = serde_json::from_slice::<Vec<Value>>(b"{\"not\": \"an array\"}").unwrap_err();
        let err: StatsError = err.into();
        assert!(matches!(err, StatsError::Decode(_)));
    }
}
