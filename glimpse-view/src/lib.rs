//! # glimpse-view — Screen Viewer
//!
//! Polls a `glimpse-share` instance for its latest frame at a fixed
//! cadence and renders each new frame (by default into a PNG file on
//! disk). At most one fetch is in flight at a time; ticks that arrive
//! while a fetch is outstanding are dropped.

pub mod config;
pub mod connection;
pub mod display;
