//! Display capture.
//!
//! The capture loop only sees the [`ScreenCapturer`] trait: "grab the
//! current display as an RGBA raster". [`DisplayCapturer`] is the real
//! implementation, built on `xcap` when the `xcap` feature is enabled.
//!
//! # Platform
//!
//! Without the `xcap` feature the type still exists but construction
//! fails with [`GlimpseError::BackendUnavailable`].

use std::sync::Arc;

use image::RgbaImage;
use tracing::debug;

use crate::error::GlimpseError;

/// Opens a fresh capturer for each capture session.
///
/// Called from the blocking pool when a session starts.
pub type CapturerFactory =
    Arc<dyn Fn() -> Result<Box<dyn ScreenCapturer>, GlimpseError> + Send + Sync>;

/// Factory producing [`DisplayCapturer`]s for one monitor.
pub fn display_capturer_factory(monitor_index: u32) -> CapturerFactory {
    Arc::new(move || -> Result<Box<dyn ScreenCapturer>, GlimpseError> {
        let capturer = DisplayCapturer::new(monitor_index)?;
        debug!(monitor = capturer.monitor_index(), "display capturer opened");
        Ok(Box::new(capturer) as Box<dyn ScreenCapturer>)
    })
}

/// Source of raw display images.
///
/// Implementations may block; the capture loop always calls them from
/// the blocking thread pool.
pub trait ScreenCapturer: Send + 'static {
    /// Capture the display as it looks right now.
    fn capture(&mut self) -> Result<RgbaImage, GlimpseError>;
}

impl<F> ScreenCapturer for F
where
    F: FnMut() -> Result<RgbaImage, GlimpseError> + Send + 'static,
{
    fn capture(&mut self) -> Result<RgbaImage, GlimpseError> {
        self()
    }
}

/// Captures a whole monitor.
///
/// Only the monitor index is kept; monitors are re-enumerated on every
/// capture so hot-plugging a display does not leave a stale handle.
#[derive(Debug, Clone)]
pub struct DisplayCapturer {
    monitor_index: u32,
}

// ── xcap implementation ──────────────────────────────────────────

#[cfg(feature = "xcap")]
mod platform {
    use super::*;
    use xcap::Monitor;

    impl DisplayCapturer {
        /// Prepare to capture monitor `monitor_index` (0 = primary).
        ///
        /// Fails early if no monitor can be enumerated at all.
        pub fn new(monitor_index: u32) -> Result<Self, GlimpseError> {
            let monitors =
                Monitor::all().map_err(|e| GlimpseError::Capture(format!("enumerate: {e}")))?;
            if monitors.is_empty() {
                return Err(GlimpseError::Capture("no monitors found".into()));
            }
            Ok(Self { monitor_index })
        }

        fn select(&self) -> Result<Monitor, GlimpseError> {
            let monitors =
                Monitor::all().map_err(|e| GlimpseError::Capture(format!("enumerate: {e}")))?;

            if self.monitor_index == 0 {
                // Primary first; some compositors never report one.
                let mut fallback = None;
                for m in monitors {
                    if m.is_primary().unwrap_or(false) {
                        return Ok(m);
                    }
                    fallback.get_or_insert(m);
                }
                return fallback.ok_or_else(|| GlimpseError::Capture("no monitors found".into()));
            }

            monitors
                .into_iter()
                .nth(self.monitor_index as usize)
                .ok_or_else(|| {
                    GlimpseError::Capture(format!("monitor {} not found", self.monitor_index))
                })
        }
    }

    impl ScreenCapturer for DisplayCapturer {
        fn capture(&mut self) -> Result<RgbaImage, GlimpseError> {
            self.select()?
                .capture_image()
                .map_err(|e| GlimpseError::Capture(e.to_string()))
        }
    }
}

// ── Stub ─────────────────────────────────────────────────────────

#[cfg(not(feature = "xcap"))]
impl DisplayCapturer {
    /// Built without a capture backend.
    pub fn new(_monitor_index: u32) -> Result<Self, GlimpseError> {
        Err(GlimpseError::BackendUnavailable(
            "rebuild with `--features xcap` to capture the display",
        ))
    }
}

#[cfg(not(feature = "xcap"))]
impl ScreenCapturer for DisplayCapturer {
    fn capture(&mut self) -> Result<RgbaImage, GlimpseError> {
        Err(GlimpseError::BackendUnavailable("not supported in this build"))
    }
}

impl DisplayCapturer {
    /// Monitor this capturer targets.
    pub fn monitor_index(&self) -> u32 {
        self.monitor_index
    }
}
