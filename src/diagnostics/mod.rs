//! Redacted diagnostics snapshots for logging.
//!
//! Snapshots combine the sanitized configuration, a process summary, and a
//! summary of the last retrieved stats. Redaction is shape-preserving and
//! non-reversible: sensitive values are replaced by markers, and oversized
//! strings are truncated with the original length recorded.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::WorkerConfig;
use crate::stats::StatsReport;
use crate::supervisor::ProcessSummary;

/// Keywords that mark a key path as sensitive (case-insensitive substring
/// match).
pub const DEFAULT_SENSITIVE_KEYWORDS: &[&str] = &["secret", "token", "password", "key", "metadata"];

/// Strings longer than this are truncated in snapshots.
const MAX_STRING_LEN: usize = 256;

/// How much of a truncated string is kept.
const TRUNCATE_PREFIX_LEN: usize = 128;

/// Read-only snapshot of harness state, generated on demand and never
/// cached.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsSnapshot {
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
    /// Operating system the harness runs on.
    pub platform: &'static str,
    /// Sanitized worker configuration.
    pub config: Value,
    /// Resolved worker executable, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
    /// Process summary, if a worker was spawned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessSummary>,
    /// Summary of the last retrieved stats, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSummary>,
}

/// Summary of a stats payload: only the entry count and the `type` tags.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub entries: usize,
    pub kinds: Vec<String>,
}

/// Produces redacted snapshots.
#[derive(Debug, Clone)]
pub struct Reporter {
    keywords: Vec<String>,
}

impl Reporter {
    /// Create a reporter with the default sensitive-keyword set.
    #[must_use]
    pub fn new() -> Self {
        Self::with_keywords(DEFAULT_SENSITIVE_KEYWORDS.iter().copied())
    }

    /// Create a reporter with a custom keyword set.
    #[must_use]
    pub fn with_keywords(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        }
    }

    fn is_sensitive(&self, key_path: &str) -> bool {
        let lower = key_path.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    /// Recursively redact a value.
    ///
    /// Values under a sensitive key path are replaced with markers;
    /// independently, any string longer than the fixed bound is truncated
    /// with its original length recorded. Container shapes and keys are
    /// preserved at arbitrary depth.
    #[must_use]
    pub fn redact(&self, value: &Value) -> Value {
        self.redact_at(value, "")
    }

    fn redact_at(&self, value: &Value, key_path: &str) -> Value {
        if !key_path.is_empty() && self.is_sensitive(key_path) {
            return redact_marker(value);
        }

        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| {
                        let child_path = if key_path.is_empty() {
                            k.clone()
                        } else {
                            format!("{key_path}.{k}")
                        };
                        (k.clone(), self.redact_at(v, &child_path))
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.redact_at(v, key_path))
                    .collect(),
            ),
            Value::String(s) => Value::String(truncate_string(s)),
            other => other.clone(),
        }
    }

    /// Produce a snapshot from the current state. Best-effort: callable at
    /// any time, including mid-failure.
    #[must_use]
    pub fn snapshot(
        &self,
        config: &WorkerConfig,
        executable: Option<&Path>,
        process: Option<ProcessSummary>,
        last_stats: Option<&[StatsReport]>,
    ) -> DiagnosticsSnapshot {
        let config = serde_json::to_value(config)
            .map(|v| self.redact(&v))
            .unwrap_or(Value::Null);

        let stats = last_stats.map(|reports| {
            let kinds: BTreeSet<String> = reports
                .iter()
                .filter_map(|r| r.kind().map(ToString::to_string))
                .collect();
            StatsSummary {
                entries: reports.len(),
                kinds: kinds.into_iter().collect(),
            }
        });

        DiagnosticsSnapshot {
            captured_at: Utc::now(),
            platform: std::env::consts::OS,
            config,
            executable: executable.map(Path::to_path_buf),
            process,
            stats,
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape-preserving, non-reversible marker for a sensitive value.
fn redact_marker(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(format!("<redacted len={}>", s.chars().count())),
        Value::Object(map) => Value::Object(
            map.keys()
                .map(|k| (k.clone(), Value::String("<redacted>".to_string())))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|_| Value::String("<redacted>".to_string()))
                .collect(),
        ),
        _ => Value::String("<redacted>".to_string()),
    }
}

fn truncate_string(s: &str) -> String {
    if s.chars().count() <= MAX_STRING_LEN {
        return s.to_string();
    }
    let prefix: String = s.chars().take(TRUNCATE_PREFIX_LEN).collect();
    format!(
        "{prefix}... (truncated, total_length={})",
        s.chars().count()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sensitive_string_replaced_with_length_marker() {
        let reporter = Reporter::new();
        let value = json!({"secret_key": "hunter2"});
        let redacted = reporter.redact(&value);
        assert_eq!(redacted["secret_key"], json!("<redacted len=7>"));
    }

    #[test]
    fn test_original_value_never_survives_as_substring() {
        let reporter = Reporter::new();
        let token = "abcdefghijklmnop-very-secret-token-qrstuvwxyz";
        let value = json!({"metadata": {"access_token": token}});
        let redacted = reporter.redact(&value);
        assert!(!redacted.to_string().contains(token));
    }

    #[test]
    fn test_sensitive_object_keeps_keys() {
        let reporter = Reporter::new();
        let value = json!({"metadata": {"access_token": "abc", "exp": 12345}});
        let redacted = reporter.redact(&value);
        // The container under "metadata" keeps its shape and keys.
        assert_eq!(
            redacted["metadata"],
            json!({"access_token": "<redacted>", "exp": "<redacted>"})
        );
    }

    #[test]
    fn test_sensitive_array_replaced_elementwise() {
        let reporter = Reporter::new();
        let value = json!({"api_tokens": ["one", "two", "three"]});
        let redacted = reporter.redact(&value);
        assert_eq!(
            redacted["api_tokens"],
            json!(["<redacted>", "<redacted>", "<redacted>"])
        );
    }

    #[test]
    fn test_sensitive_match_is_case_insensitive_substring() {
        let reporter = Reporter::new();
        let value = json!({"ProxyPassword": "s3cret", "client_KEY": "pem"});
        let redacted = reporter.redact(&value);
        assert_eq!(redacted["ProxyPassword"], json!("<redacted len=6>"));
        assert_eq!(redacted["client_KEY"], json!("<redacted len=3>"));
    }

    #[test]
    fn test_non_string_scalar_under_sensitive_path() {
        let reporter = Reporter::new();
        let value = json!({"token_count": 42});
        let redacted = reporter.redact(&value);
        assert_eq!(redacted["token_count"], json!("<redacted>"));
    }

    #[test]
    fn test_nested_key_paths_recurse_to_depth() {
        let reporter = Reporter::new();
        let value = json!({
            "outer": {"inner": {"secret": "deep", "plain": "kept"}}
        });
        let redacted = reporter.redact(&value);
        assert_eq!(
            redacted["outer"]["inner"]["secret"],
            json!("<redacted len=4>")
        );
        assert_eq!(redacted["outer"]["inner"]["plain"], json!("kept"));
    }

    #[test]
    fn test_long_strings_truncated_with_length() {
        let reporter = Reporter::new();
        let long = "x".repeat(500);
        let value = json!({"description": long});
        let redacted = reporter.redact(&value);
        let s = redacted["description"].as_str().unwrap();
        assert!(s.starts_with(&"x".repeat(128)));
        assert!(s.ends_with("... (truncated, total_length=500)"));
    }

    #[test]
    fn test_short_strings_and_scalars_pass_through() {
        let reporter = Reporter::new();
        let value = json!({"role": "sendonly", "port": 55001, "flag": true, "nothing": null});
        assert_eq!(reporter.redact(&value), value);
    }

    #[test]
    fn test_custom_keywords() {
        let reporter = Reporter::with_keywords(["internal"]);
        let value = json!({"internal_id": "abc", "secret": "visible"});
        let redacted = reporter.redact(&value);
        assert_eq!(redacted["internal_id"], json!("<redacted len=3>"));
        // "secret" is not in the custom keyword set.
        assert_eq!(redacted["secret"], json!("visible"));
    }

    #[test]
    fn test_snapshot_redacts_config_metadata() {
        use crate::config::{Role, WorkerConfig};

        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "access_token".to_string(),
            json!("very-long-signing-token-value"),
        );
        let config = WorkerConfig::builder("wss://media.example.com/signaling", "ch", Role::Sendonly)
            .metadata(metadata)
            .http_port(55004)
            .build()
            .unwrap();

        let reporter = Reporter::new();
        let snapshot = reporter.snapshot(&config, None, None, None);
        let rendered = serde_json::to_string(&snapshot).unwrap();
        assert!(!rendered.contains("very-long-signing-token-value"));
        assert_eq!(snapshot.config["channel_id"], json!("ch"));
    }

    #[test]
    fn test_snapshot_stats_summary_uses_type_tags_only() {
        use crate::config::{Role, WorkerConfig};
        use crate::stats::StatsReport;

        let config = WorkerConfig::builder("wss://x.example.com", "ch", Role::Recvonly)
            .build()
            .unwrap();
        let reports = vec![
            StatsReport::new(json!({"type": "codec"})),
            StatsReport::new(json!({"type": "transport"})),
            StatsReport::new(json!({"type": "codec"})),
        ];

        let snapshot = Reporter::new().snapshot(&config, None, None, Some(&reports));
        let stats = snapshot.stats.unwrap();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.kinds, ["codec", "transport"]);
    }
}
