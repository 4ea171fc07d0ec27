//! # screen — capture, publish, poll
//!
//! ## Architecture
//!
//! ```text
//! SHARER                                        VIEWER
//! ┌──────────────────────────┐                 ┌───────────────────────┐
//! │ ScreenCapturer           │                 │ ConsumerPollLoop      │
//! │   ↓                      │   GET           │   tick (busy? skip)   │
//! │ FrameEncoder (PNG)       │   /fetch-png    │   ↓                   │
//! │   ↓                      │ ◄────────────── │ FrameSource::fetch    │
//! │ FrameBuffer::publish     │ ──────────────► │   ↓                   │
//! │   ↑ CaptureLoop (500 ms) │   image/png     │ decode_png            │
//! │                          │                 │   ↓                   │
//! │ SessionController        │                 │ RenderSink::render    │
//! │ ShutdownCoordinator      │                 │                       │
//! └──────────────────────────┘                 └───────────────────────┘
//! ```
//!
//! ## Sub-modules
//!
//! | Module         | Purpose                                            |
//! |----------------|----------------------------------------------------|
//! | `frame`        | `EncodedFrame` and the latest-wins `FrameBuffer`   |
//! | `capture`      | `ScreenCapturer` trait, xcap display capturer      |
//! | `encoder`      | PNG frame encoder                                  |
//! | `decoder`      | PNG frame decoder (viewer side)                    |
//! | `capture_loop` | Timer-driven producer with retry and drain         |
//! | `session`      | Single-active-session start/stop controller        |
//! | `shutdown`     | SIGINT/SIGTERM → cancellation, bounded drain wait  |
//! | `poll`         | Viewer poll loop with busy-flag backpressure       |

pub mod capture;
pub mod capture_loop;
pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod poll;
pub mod session;
pub mod shutdown;

// ── Re-exports ───────────────────────────────────────────────────

pub use capture::{CapturerFactory, DisplayCapturer, ScreenCapturer, display_capturer_factory};
pub use capture_loop::{CaptureConfig, CaptureLoop, LoopExit, LoopState};
pub use decoder::{DecodedFrame, decode_png};
pub use encoder::{FrameEncoder, PngFrameEncoder};
pub use frame::{EncodedFrame, FrameBuffer};
pub use poll::{ConsumerPollLoop, FrameSource, PollConfig, PollStats, RenderSink, TickOutcome};
pub use session::{SessionController, SessionStatus, StartOutcome, StopOutcome};
pub use shutdown::{ShutdownCoordinator, termination_signal};
