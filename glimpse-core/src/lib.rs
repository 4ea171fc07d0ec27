//! # glimpse-core
//!
//! Core library for glimpse, a poll-based screen sharer.
//!
//! This crate contains:
//! - **Frames**: `EncodedFrame` and the process-wide latest-wins `FrameBuffer`
//! - **Producer**: `CaptureLoop` driven by a `ScreenCapturer` + `FrameEncoder`
//! - **Control**: `SessionController` (start/stop) and `ShutdownCoordinator`
//! - **Consumer**: `ConsumerPollLoop` over a `FrameSource` / `RenderSink`
//! - **Error**: `GlimpseError` — typed, `thiserror`-based error hierarchy

pub mod error;
pub mod screen;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use error::GlimpseError;
pub use screen::{
    CaptureConfig, CaptureLoop, CapturerFactory, ConsumerPollLoop, DecodedFrame,
    DisplayCapturer, EncodedFrame, FrameBuffer, FrameEncoder, FrameSource, LoopExit, LoopState,
    PngFrameEncoder, PollConfig, PollStats, RenderSink, ScreenCapturer, SessionController,
    SessionStatus, ShutdownCoordinator, StartOutcome, StopOutcome, TickOutcome, decode_png,
    display_capturer_factory, termination_signal,
};
