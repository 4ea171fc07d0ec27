//! Viewer configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Polling cadence.
    pub poll: PollSettings,
    /// Where frames are rendered.
    pub output: OutputConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Base URL of the sharer, without a trailing path.
    pub server_url: String,
    /// Per-request timeout in milliseconds.
    pub fetch_timeout_ms: u64,
}

/// Polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Milliseconds between ticks.
    pub interval_ms: u64,
    /// How long an in-flight fetch may finish after shutdown.
    pub drain_delay_ms: u64,
}

/// Render target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// File the latest frame is written to.
    pub path: PathBuf,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            fetch_timeout_ms: 2000,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            drain_delay_ms: 1000,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("glimpse-latest.png"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.network.fetch_timeout_ms.max(1))
    }

    /// Convert poll settings into a `PollConfig`.
    pub fn to_poll_config(&self) -> glimpse_core::PollConfig {
        glimpse_core::PollConfig {
            interval: Duration::from_millis(self.poll.interval_ms.max(10)),
            fetch_timeout: self.fetch_timeout(),
            drain_delay: Duration::from_millis(self.poll.drain_delay_ms),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = ViewConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("server_url"));
        assert!(text.contains("interval_ms"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = ViewConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ViewConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.poll.interval_ms, 100);
        assert_eq!(parsed.network.server_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn poll_config_carries_timeouts() {
        let mut cfg = ViewConfig::default();
        cfg.network.fetch_timeout_ms = 750;
        cfg.poll.interval_ms = 0;
        let poll = cfg.to_poll_config();
        assert_eq!(poll.fetch_timeout, Duration::from_millis(750));
        assert_eq!(poll.interval, Duration::from_millis(10));
    }
}
