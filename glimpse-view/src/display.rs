//! Render sinks — where decoded frames end up.
//!
//! [`FileSink`] keeps the latest frame on disk as a PNG that any image
//! viewer can keep open and reload. [`LogSink`] only logs what it
//! would have drawn.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::info;

use glimpse_core::{DecodedFrame, GlimpseError, RenderSink};

// ── FileSink ─────────────────────────────────────────────────────

/// Writes each rendered frame to a file.
///
/// The frame is written to a sibling temp file and renamed over the
/// target, so readers never observe a half-written image.
pub struct FileSink {
    path: PathBuf,
    tmp: PathBuf,
    dims: Mutex<Option<(u32, u32)>>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        Self {
            path,
            tmp: PathBuf::from(tmp),
            dims: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RenderSink for FileSink {
    async fn render(&self, frame: &DecodedFrame) -> Result<(), GlimpseError> {
        tokio::fs::write(&self.tmp, frame.encoded.as_bytes()).await?;
        tokio::fs::rename(&self.tmp, &self.path).await?;

        let dims = (frame.width(), frame.height());
        let previous = self
            .dims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(dims);
        if previous != Some(dims) {
            info!("remote screen {}x{} → {}", dims.0, dims.1, self.path.display());
        }
        Ok(())
    }
}

// ── LogSink ──────────────────────────────────────────────────────

/// Logs frame dimensions and size; renders nothing.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl RenderSink for LogSink {
    async fn render(&self, frame: &DecodedFrame) -> Result<(), GlimpseError> {
        info!(
            width = frame.width(),
            height = frame.height(),
            bytes = frame.encoded.len(),
            "frame received"
        );
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
