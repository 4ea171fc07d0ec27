//! Sharer-side capture loop.
//!
//! On every tick the loop:
//!
//! 1. Captures the display through a [`ScreenCapturer`].
//! 2. Encodes the raster with a [`FrameEncoder`].
//! 3. Publishes the result into the shared [`FrameBuffer`].
//!
//! Capture and encode run on the blocking pool under a deadline so a
//! wedged capture backend never stalls the runtime. Cancellation is
//! checked at tick boundaries only; an in-flight capture finishes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::GlimpseError;
use crate::screen::capture::{CapturerFactory, ScreenCapturer};
use crate::screen::encoder::FrameEncoder;
use crate::screen::frame::{EncodedFrame, FrameBuffer};

type SharedCapturer = Arc<Mutex<Box<dyn ScreenCapturer>>>;

// ── CaptureConfig ────────────────────────────────────────────────

/// Configuration for [`CaptureLoop`].
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Time between captures.
    pub interval: Duration,
    /// Wait after cancellation before the loop tears down.
    pub drain_delay: Duration,
    /// Deadline for one capture + encode step.
    pub capture_timeout: Duration,
    /// Consecutive failures tolerated before the session aborts.
    pub max_consecutive_failures: u32,
    /// Upper bound for the retry backoff.
    pub max_backoff: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            drain_delay: Duration::from_secs(1),
            capture_timeout: Duration::from_secs(2),
            max_consecutive_failures: 5,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl CaptureConfig {
    /// Backoff applied after the `failures`-th consecutive failure:
    /// one interval, doubling each time, capped at `max_backoff`.
    pub fn backoff(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(16);
        self.interval
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

// ── LoopState ────────────────────────────────────────────────────

/// Lifecycle of one capture loop.
///
/// `Idle → Running → Draining → Stopped`. `Stopped` is terminal; a new
/// session builds a new loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Idle,
    Running,
    Draining,
    Stopped,
}

/// Summary returned when a loop ends after cancellation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopExit {
    /// Frames published by this loop.
    pub frames_published: u64,
    /// Capture/encode failures that were retried.
    pub failures: u64,
}

// ── CaptureLoop ──────────────────────────────────────────────────

/// Timer-driven producer of [`EncodedFrame`]s.
///
/// # Lifetime
///
/// [`run`](Self::run) consumes the loop and returns once the
/// cancellation token fires and the drain delay has elapsed, or once
/// too many consecutive captures have failed.
pub struct CaptureLoop {
    factory: CapturerFactory,
    encoder: Arc<dyn FrameEncoder>,
    frames: Arc<FrameBuffer>,
    config: CaptureConfig,
    state_tx: watch::Sender<LoopState>,
}

impl CaptureLoop {
    pub fn new(
        factory: CapturerFactory,
        encoder: Arc<dyn FrameEncoder>,
        frames: Arc<FrameBuffer>,
        config: CaptureConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(LoopState::Idle);
        Self {
            factory,
            encoder,
            frames,
            config,
            state_tx,
        }
    }

    /// A receiver that tracks the loop's [`LoopState`].
    pub fn state_receiver(&self) -> watch::Receiver<LoopState> {
        self.state_tx.subscribe()
    }

    /// Run until `cancel` fires.
    ///
    /// ```no_run
    /// # use glimpse_core::screen::capture_loop::CaptureLoop;
    /// # async fn example(capture: CaptureLoop) {
    /// let cancel = tokio_util::sync::CancellationToken::new();
    /// let handle = tokio::spawn(capture.run(cancel.clone()));
    /// // … later …
    /// cancel.cancel();
    /// let _ = handle.await;
    /// # }
    /// ```
    pub async fn run(self, cancel: CancellationToken) -> Result<LoopExit, GlimpseError> {
        let capturer = match self.open_capturer().await {
            Ok(c) => c,
            Err(e) => {
                error!("cannot open screen capturer: {e}");
                self.state_tx.send_replace(LoopState::Stopped);
                return Err(e);
            }
        };

        self.state_tx.send_replace(LoopState::Running);
        info!("capture loop running every {:?}", self.config.interval);

        let period = self.config.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut exit = LoopExit::default();
        let mut consecutive: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.capture_once(&capturer).await {
                Ok(frame) => {
                    if consecutive > 0 {
                        info!("capture recovered after {consecutive} failure(s)");
                    }
                    consecutive = 0;
                    debug!(bytes = frame.len(), "frame published");
                    self.frames.publish(frame);
                    exit.frames_published += 1;
                }
                Err(e) if !e.is_retryable() => {
                    error!("capture loop stopping: {e}");
                    self.state_tx.send_replace(LoopState::Stopped);
                    return Err(e);
                }
                Err(e) => {
                    consecutive += 1;
                    exit.failures += 1;

                    if consecutive >= self.config.max_consecutive_failures {
                        error!("capture failed {consecutive} times in a row; aborting session");
                        self.state_tx.send_replace(LoopState::Stopped);
                        return Err(GlimpseError::CaptureAborted {
                            attempts: consecutive,
                            last: e.to_string(),
                        });
                    }

                    let backoff = self.config.backoff(consecutive);
                    warn!("capture failed ({consecutive}): {e}; retrying in {backoff:?}");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    ticker.reset_immediately();
                }
            }
        }

        self.state_tx.send_replace(LoopState::Draining);
        info!("terminating stream");
        tokio::time::sleep(self.config.drain_delay).await;
        self.state_tx.send_replace(LoopState::Stopped);
        info!(
            frames = exit.frames_published,
            failures = exit.failures,
            "capture loop stopped"
        );
        Ok(exit)
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn open_capturer(&self) -> Result<SharedCapturer, GlimpseError> {
        let factory = Arc::clone(&self.factory);
        let capturer = tokio::task::spawn_blocking(move || factory()).await??;
        Ok(Arc::new(Mutex::new(capturer)))
    }

    /// One capture + encode step on the blocking pool, under deadline.
    async fn capture_once(
        &self,
        capturer: &SharedCapturer,
    ) -> Result<EncodedFrame, GlimpseError> {
        let capturer = Arc::clone(capturer);
        let encoder = Arc::clone(&self.encoder);

        let work = tokio::task::spawn_blocking(move || {
            let image = {
                let mut guard = capturer
                    .lock()
                    .map_err(|_| GlimpseError::Capture("capturer lock poisoned".into()))?;
                guard.capture()?
            };
            encoder.encode(&image)
        });

        match tokio::time::timeout(self.config.capture_timeout, work).await {
            Ok(joined) => joined?,
            Err(_) => Err(GlimpseError::Timeout(self.config.capture_timeout)),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
