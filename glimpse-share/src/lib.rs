//! # glimpse-share — Screen Sharer
//!
//! Captures the local display on demand, keeps the most recent frame as
//! a PNG, and serves it over HTTP to any number of viewers
//! (`glimpse-view` or a browser on `/shared-screen`).
//!
//! Sharing is toggled remotely with `/start-sharing` and
//! `/stop-sharing`; SIGINT/SIGTERM stop every capture loop within a
//! bounded grace period before the HTTP server exits.

pub mod config;
pub mod service;
