//! Harness settings file loader.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Harness settings loaded from a TOML file.
///
/// These configure the harness itself (where the worker binary lives, default
/// timeouts), not the worker's own options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    /// Root directory containing per-target build output.
    pub build_root: PathBuf,
    /// Worker binary name (without platform suffix).
    pub binary_name: String,
    /// Default signaling URL for launched workers.
    pub signaling_url: Option<String>,
    /// Prefix for generated channel ids.
    pub channel_id_prefix: Option<String>,
    /// Overall readiness budget in seconds.
    pub ready_timeout_secs: u64,
    /// Bootstrap grace period in seconds before polling starts.
    pub initial_wait_secs: u64,
    /// Grace period in seconds before escalating terminate to kill.
    pub grace_secs: u64,
    /// Capture worker stdout/stderr in the background.
    pub capture: bool,
    /// Base of the ephemeral port range handed out to workers.
    pub port_base: u16,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            build_root: PathBuf::from("_build"),
            binary_name: "media-worker".to_string(),
            signaling_url: None,
            channel_id_prefix: None,
            ready_timeout_secs: 30,
            initial_wait_secs: 2,
            grace_secs: 5,
            capture: false,
            port_base: crate::supervisor::PortAllocator::DEFAULT_BASE,
        }
    }
}

impl HarnessSettings {
    /// Overall readiness budget.
    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    /// Bootstrap grace period.
    #[must_use]
    pub fn initial_wait(&self) -> Duration {
        Duration::from_secs(self.initial_wait_secs)
    }

    /// Terminate-to-kill grace period.
    #[must_use]
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

/// Settings loader that searches a fixed list of locations.
#[derive(Debug)]
pub struct SettingsLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
}

impl SettingsLoader {
    /// Create a new loader with the default search path
    /// (`.media-harness.toml` in the current directory).
    #[must_use]
    pub fn new() -> Self {
        Self {
            search_paths: vec![PathBuf::from(".media-harness.toml")],
        }
    }

    /// Create a loader for a specific settings file.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// Load settings from the first available file, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or
    /// parsed.
    pub fn load(&self) -> Result<HarnessSettings, SettingsError> {
        for path in &self.search_paths {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading harness settings");
                return Self::load_from_path(path);
            }
        }

        tracing::debug!("No settings file found, using defaults");
        Ok(HarnessSettings::default())
    }

    fn load_from_path(path: &PathBuf) -> Result<HarnessSettings, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::ReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| SettingsError::ParseError {
            path: path.clone(),
            source: e,
        })
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur while loading harness settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}
