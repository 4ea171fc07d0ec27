//! Domain-specific error types for glimpse.
//!
//! All fallible operations return `Result<T, GlimpseError>`.
//! Capture and fetch failures are typed so the loops can decide
//! whether to retry, skip, or give up.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for glimpse.
#[derive(Debug, Error)]
pub enum GlimpseError {
    // ── Producer Errors ──────────────────────────────────────────
    /// The display could not be captured.
    #[error("capture failed: {0}")]
    Capture(String),

    /// No capture backend was compiled into this build.
    #[error("no screen capture backend available: {0}")]
    BackendUnavailable(&'static str),

    /// A raster image could not be encoded.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The capture loop gave up after too many consecutive failures.
    #[error("capture aborted after {attempts} consecutive failures: {last}")]
    CaptureAborted { attempts: u32, last: String },

    // ── Consumer Errors ──────────────────────────────────────────
    /// The frame endpoint could not be reached or answered with an error.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The endpoint answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// A fetched payload was not a decodable image.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The render sink rejected a frame.
    #[error("render failed: {0}")]
    Render(String),

    // ── Runtime Errors ───────────────────────────────────────────
    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The I/O layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task panicked or was cancelled by the runtime.
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl GlimpseError {
    /// Whether the producer may retry after this error.
    ///
    /// A missing backend never fixes itself; everything else on the
    /// capture path is treated as transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            GlimpseError::BackendUnavailable(_) | GlimpseError::CaptureAborted { .. }
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for GlimpseError {
    fn from(s: String) -> Self {
        GlimpseError::Other(s)
    }
}

impl From<&str> for GlimpseError {
    fn from(s: &str) -> Self {
        GlimpseError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = GlimpseError::CaptureAborted {
            attempts: 5,
            last: "no display".into(),
        };
        assert!(e.to_string().contains('5'));
        assert!(e.to_string().contains("no display"));

        let e = GlimpseError::Status(503);
        assert!(e.to_string().contains("503"));
    }

    #[test]
    fn from_string() {
        let e: GlimpseError = "something broke".into();
        assert!(matches!(e, GlimpseError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: GlimpseError = io_err.into();
        assert!(matches!(e, GlimpseError::Io(_)));
    }

    #[test]
    fn retryable_classification() {
        assert!(GlimpseError::Capture("flaky".into()).is_retryable());
        assert!(GlimpseError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!GlimpseError::BackendUnavailable("none").is_retryable());
    }
}
