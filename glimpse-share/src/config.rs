//! Configuration for the sharer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Screen capture settings.
    pub capture: CaptureSettings,
    /// Shutdown behaviour.
    pub shutdown: ShutdownConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the HTTP server binds to.
    pub bind_address: String,
    /// Directory served at `/` for static assets.
    pub static_root: PathBuf,
}

/// Screen capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Milliseconds between captures.
    pub interval_ms: u64,
    /// Milliseconds the loop lingers after a stop before tearing down.
    pub drain_delay_ms: u64,
    /// Deadline for a single capture + encode, in milliseconds.
    pub timeout_ms: u64,
    /// Consecutive failures tolerated before the session is aborted.
    pub max_consecutive_failures: u32,
    /// Cap on the retry backoff, in milliseconds.
    pub max_backoff_ms: u64,
    /// Monitor index to capture (0 = primary).
    pub monitor_index: u32,
}

/// Shutdown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long to wait for capture loops to drain on SIGINT/SIGTERM.
    pub grace_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".into(),
            static_root: PathBuf::from("./static"),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            drain_delay_ms: 1000,
            timeout_ms: 2000,
            max_consecutive_failures: 5,
            max_backoff_ms: 5000,
            monitor_index: 0,
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_ms: 3000 }
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

impl ShareConfig {
    /// Load configuration from a TOML file, falling back to defaults.
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

    /// Convert capture settings into a `CaptureConfig`.
    pub fn to_capture_config(&self) -> glimpse_core::CaptureConfig {
        let c = &self.capture;
        glimpse_core::CaptureConfig {
            interval: Duration::from_millis(c.interval_ms.max(10)),
            drain_delay: Duration::from_millis(c.drain_delay_ms),
            capture_timeout: Duration::from_millis(c.timeout_ms.max(1)),
            max_consecutive_failures: c.max_consecutive_failures.max(1),
            max_backoff: Duration::from_millis(c.max_backoff_ms),
        }
    }

    /// Bounded wait for capture loops at shutdown.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown.grace_ms)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = ShareConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("bind_address"));
        assert!(text.contains("interval_ms"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let parsed: ShareConfig = toml::from_str("[capture]\ninterval_ms = 250\n").unwrap();
        assert_eq!(parsed.capture.interval_ms, 250);
        assert_eq!(parsed.capture.drain_delay_ms, 1000);
        assert_eq!(parsed.network.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn to_capture_config_clamps() {
        let mut cfg = ShareConfig::default();
        cfg.capture.interval_ms = 0;
        cfg.capture.max_consecutive_failures = 0;
        let capture = cfg.to_capture_config();
        assert_eq!(capture.interval, Duration::from_millis(10));
        assert_eq!(capture.max_consecutive_failures, 1);
    }

    #[test]
    fn missing_file_falls_back() {
        let cfg = ShareConfig::load(Path::new("/definitely/not/here.toml"));
        assert_eq!(cfg.capture.interval_ms, 500);
    }
}
