//! Viewer-side poll loop.
//!
//! Every tick the loop asks a [`FrameSource`] for the latest frame,
//! decodes it, and hands it to a [`RenderSink`]. A busy flag keeps at
//! most one fetch in flight: a tick that finds the previous fetch still
//! running is dropped, not queued. This is the only backpressure
//! between viewers and the sharer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::GlimpseError;
use crate::screen::decoder::{DecodedFrame, decode_png};
use crate::screen::frame::EncodedFrame;

// ── Collaborators ────────────────────────────────────────────────

/// Where frames come from (normally the sharer's `/fetch-png`).
#[async_trait]
pub trait FrameSource: Send + Sync + 'static {
    /// Fetch the current frame. An empty frame means "nothing shared yet".
    async fn fetch(&self) -> Result<EncodedFrame, GlimpseError>;
}

/// Where decoded frames go.
#[async_trait]
pub trait RenderSink: Send + Sync + 'static {
    async fn render(&self, frame: &DecodedFrame) -> Result<(), GlimpseError>;
}

// ── PollConfig / PollStats ───────────────────────────────────────

/// Configuration for [`ConsumerPollLoop`].
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Time between ticks.
    pub interval: Duration,
    /// Deadline for one fetch.
    pub fetch_timeout: Duration,
    /// How long to wait for an in-flight fetch after cancellation.
    pub drain_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            fetch_timeout: Duration::from_secs(2),
            drain_delay: Duration::from_secs(1),
        }
    }
}

/// Counters exposed to the UI / logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Ticks observed.
    pub ticks: u64,
    /// Fetches issued.
    pub fetches: u64,
    /// Ticks dropped because a fetch was still in flight.
    pub skipped_busy: u64,
    /// Frames handed to the sink.
    pub rendered: u64,
    /// Fetches that returned the frame already rendered.
    pub unchanged: u64,
    /// Fetches that returned an empty payload.
    pub empty: u64,
    /// Fetch, decode or render failures.
    pub failures: u64,
}

/// What a single [`ConsumerPollLoop::tick`] did.
#[derive(Debug)]
pub enum TickOutcome {
    /// A fetch was already in flight; nothing was issued.
    Skipped,
    /// A fetch was issued on its own task.
    Dispatched(JoinHandle<()>),
}

// ── ConsumerPollLoop ─────────────────────────────────────────────

struct Shared {
    source: Arc<dyn FrameSource>,
    sink: Arc<dyn RenderSink>,
    busy: AtomicBool,
    fetch_timeout: Duration,
    stats: watch::Sender<PollStats>,
    last_rendered: Mutex<Option<blake3::Hash>>,
}

/// Clears the busy flag when the fetch task ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Polls a [`FrameSource`] and renders into a [`RenderSink`].
pub struct ConsumerPollLoop {
    shared: Arc<Shared>,
    config: PollConfig,
}

impl ConsumerPollLoop {
    pub fn new(
        source: Arc<dyn FrameSource>,
        sink: Arc<dyn RenderSink>,
        config: PollConfig,
    ) -> Self {
        let (stats, _) = watch::channel(PollStats::default());
        Self {
            shared: Arc::new(Shared {
                source,
                sink,
                busy: AtomicBool::new(false),
                fetch_timeout: config.fetch_timeout,
                stats,
                last_rendered: Mutex::new(None),
            }),
            config,
        }
    }

    /// A receiver for live [`PollStats`].
    pub fn stats_receiver(&self) -> watch::Receiver<PollStats> {
        self.shared.stats.subscribe()
    }

    /// Current counters.
    pub fn stats(&self) -> PollStats {
        self.shared.stats.borrow().clone()
    }

    /// Whether a fetch is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// One tick: issue a fetch unless one is already in flight.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn tick(&self) -> TickOutcome {
        self.shared.stats.send_modify(|s| s.ticks += 1);

        if self.shared.busy.swap(true, Ordering::AcqRel) {
            self.shared.stats.send_modify(|s| s.skipped_busy += 1);
            trace!("previous fetch still in flight; tick skipped");
            return TickOutcome::Skipped;
        }

        let shared = Arc::clone(&self.shared);
        TickOutcome::Dispatched(tokio::spawn(async move {
            let _busy = BusyGuard(&shared.busy);
            fetch_and_render(&shared).await;
        }))
    }

    /// Tick every `interval` until `cancel` fires.
    ///
    /// After cancellation, an in-flight fetch gets up to `drain_delay`
    /// to finish. Returns the final counters.
    pub async fn run(&self, cancel: CancellationToken) -> PollStats {
        info!("polling every {:?}", self.config.interval);
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let TickOutcome::Dispatched(handle) = self.tick() {
                in_flight = Some(handle);
            }
        }

        if let Some(handle) = in_flight.filter(|h| !h.is_finished()) {
            debug!("waiting for in-flight fetch");
            if tokio::time::timeout(self.config.drain_delay, handle)
                .await
                .is_err()
            {
                warn!("in-flight fetch abandoned after {:?}", self.config.drain_delay);
            }
        }

        let stats = self.stats();
        info!(
            fetches = stats.fetches,
            rendered = stats.rendered,
            skipped = stats.skipped_busy,
            failures = stats.failures,
            "poll loop stopped"
        );
        stats
    }
}

/// Fetch → decode → render. Every failure is logged and counted; none
/// escapes, so the loop keeps going.
async fn fetch_and_render(shared: &Shared) {
    shared.stats.send_modify(|s| s.fetches += 1);

    let fetched = match tokio::time::timeout(shared.fetch_timeout, shared.source.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(GlimpseError::Timeout(shared.fetch_timeout)),
    };
    let frame = match fetched {
        Ok(frame) => frame,
        Err(e) => {
            warn!("fetch failed: {e}");
            shared.stats.send_modify(|s| s.failures += 1);
            return;
        }
    };

    if frame.is_empty() {
        debug!("nothing shared yet");
        shared.stats.send_modify(|s| s.empty += 1);
        return;
    }

    let digest = frame.digest();
    let unchanged = *shared
        .last_rendered
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        == Some(digest);
    if unchanged {
        trace!("frame unchanged");
        shared.stats.send_modify(|s| s.unchanged += 1);
        return;
    }

    let decoded = match tokio::task::spawn_blocking(move || decode_png(frame)).await {
        Ok(Ok(decoded)) => decoded,
        Ok(Err(e)) => {
            warn!("dropping undecodable frame: {e}");
            shared.stats.send_modify(|s| s.failures += 1);
            return;
        }
        Err(e) => {
            warn!("decode task failed: {e}");
            shared.stats.send_modify(|s| s.failures += 1);
            return;
        }
    };

    match shared.sink.render(&decoded).await {
        Ok(()) => {
            *shared
                .last_rendered
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(digest);
            debug!(
                width = decoded.width(),
                height = decoded.height(),
                "frame rendered"
            );
            shared.stats.send_modify(|s| s.rendered += 1);
        }
        Err(e) => {
            warn!("render failed: {e}");
            shared.stats.send_modify(|s| s.failures += 1);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
