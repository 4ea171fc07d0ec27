//! Start/stop coordination for capture sessions.
//!
//! [`SessionController`] owns at most one running [`CaptureLoop`]. Each
//! session gets its own cancellation token, a child of the process-wide
//! shutdown token, so a stopped session never poisons the next one and
//! a process shutdown reaches whichever session is live.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use crate::error::GlimpseError;
use crate::screen::capture::CapturerFactory;
use crate::screen::capture_loop::{CaptureConfig, CaptureLoop, LoopExit, LoopState};
use crate::screen::encoder::FrameEncoder;
use crate::screen::frame::FrameBuffer;

type LoopHandle = JoinHandle<Result<LoopExit, GlimpseError>>;

// ── Outcomes ─────────────────────────────────────────────────────

/// Result of [`SessionController::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new capture loop was spawned.
    Started { session: u64 },
    /// A session is already live; nothing was spawned.
    AlreadyRunning { session: u64 },
    /// The process is shutting down; nothing was spawned.
    ShuttingDown,
}

/// Result of [`SessionController::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The live session was told to stop and is draining.
    Stopped { session: u64 },
    /// There was nothing to stop.
    NotRunning,
}

/// Snapshot of the controller, served as JSON by the sharer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    /// Whether a capture loop is currently live.
    pub sharing: bool,
    /// Id of the live session, if any.
    pub session: Option<u64>,
    /// State of the live session's loop.
    pub state: LoopState,
    /// Frames published since process start.
    pub frames_published: u64,
    /// Size of the frame currently served.
    pub frame_bytes: usize,
}

// ── SessionController ────────────────────────────────────────────

struct ActiveSession {
    id: u64,
    cancel: CancellationToken,
    state: watch::Receiver<LoopState>,
    handle: LoopHandle,
}

impl ActiveSession {
    fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Spawns and cancels capture sessions over a shared [`FrameBuffer`].
///
/// All methods take `&self`; the controller is meant to live in an
/// `Arc` shared with every request handler.
pub struct SessionController {
    frames: Arc<FrameBuffer>,
    factory: CapturerFactory,
    encoder: Arc<dyn FrameEncoder>,
    config: CaptureConfig,
    shutdown: CancellationToken,
    next_id: AtomicU64,
    active: Mutex<Option<ActiveSession>>,
    /// Stopped sessions that may still be draining.
    retired: Mutex<Vec<LoopHandle>>,
}

impl SessionController {
    pub fn new(
        frames: Arc<FrameBuffer>,
        factory: CapturerFactory,
        encoder: Arc<dyn FrameEncoder>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            frames,
            factory,
            encoder,
            config,
            shutdown: CancellationToken::new(),
            next_id: AtomicU64::new(1),
            active: Mutex::new(None),
            retired: Mutex::new(Vec::new()),
        }
    }

    /// The frame buffer sessions publish into.
    pub fn frames(&self) -> &Arc<FrameBuffer> {
        &self.frames
    }

    /// MIME type of the frames sessions publish.
    pub fn content_type(&self) -> &'static str {
        self.encoder.content_type()
    }

    /// Process-wide token; cancelling it stops every session.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start a capture session unless one is already live.
    ///
    /// Returns immediately; the loop runs on its own task, detached
    /// from the caller. Must be called from within a Tokio runtime.
    pub fn start(&self) -> StartOutcome {
        // Checked under the lock: `shutdown` cancels before it takes the
        // active slot, so a session stored here is always joined.
        let mut active = self.lock_active();
        if self.shutdown.is_cancelled() {
            return StartOutcome::ShuttingDown;
        }
        if let Some(current) = active.as_ref().filter(|s| s.is_live()) {
            info!(session = current.id, "start ignored: session already running");
            return StartOutcome::AlreadyRunning {
                session: current.id,
            };
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.shutdown.child_token();
        let capture = CaptureLoop::new(
            Arc::clone(&self.factory),
            Arc::clone(&self.encoder),
            Arc::clone(&self.frames),
            self.config.clone(),
        );
        let state = capture.state_receiver();
        let handle = tokio::spawn(
            capture
                .run(cancel.clone())
                .instrument(info_span!("session", id)),
        );

        info!(session = id, "sharing started");
        *active = Some(ActiveSession {
            id,
            cancel,
            state,
            handle,
        });
        StartOutcome::Started { session: id }
    }

    /// Cancel the live session, if any. Never fails.
    pub fn stop(&self) -> StopOutcome {
        let taken = self.lock_active().take();
        let Some(session) = taken.filter(ActiveSession::is_live) else {
            return StopOutcome::NotRunning;
        };

        session.cancel.cancel();
        info!(session = session.id, "sharing stopped");

        let mut retired = self.lock_retired();
        retired.retain(|h| !h.is_finished());
        retired.push(session.handle);

        StopOutcome::Stopped {
            session: session.id,
        }
    }

    /// Whether a capture loop is currently live.
    pub fn is_sharing(&self) -> bool {
        self.lock_active().as_ref().is_some_and(ActiveSession::is_live)
    }

    pub fn status(&self) -> SessionStatus {
        let active = self.lock_active();
        let live = active.as_ref().filter(|s| s.is_live());
        SessionStatus {
            sharing: live.is_some(),
            session: live.map(|s| s.id),
            state: live.map_or(LoopState::Idle, |s| *s.state.borrow()),
            frames_published: self.frames.published(),
            frame_bytes: self.frames.current_len(),
        }
    }

    /// Cancel everything and wait up to `grace` for every loop,
    /// draining ones included, to finish.
    ///
    /// Returns `true` if all loops acknowledged in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.shutdown.cancel();

        let mut handles = std::mem::take(&mut *self.lock_retired());
        if let Some(session) = self.lock_active().take() {
            handles.push(session.handle);
        }
        if handles.is_empty() {
            return true;
        }

        info!("waiting up to {grace:?} for {} capture loop(s)", handles.len());
        match tokio::time::timeout(grace, futures::future::join_all(handles)).await {
            Ok(results) => {
                for result in results {
                    match result {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => warn!("capture loop ended with error: {e}"),
                        Err(e) => warn!("capture loop task failed: {e}"),
                    }
                }
                true
            }
            Err(_) => {
                warn!("capture loops did not finish within {grace:?}");
                false
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_retired(&self) -> MutexGuard<'_, Vec<LoopHandle>> {
        self.retired.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ────────────────────────────────────────────────────────
