//! Frame types shared between the producer and the distribution layer.
//!
//! [`EncodedFrame`] is the unit that travels from the capture loop to
//! every viewer. [`FrameBuffer`] holds the most recent one.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::watch;

// ── EncodedFrame ─────────────────────────────────────────────────

/// One encoded snapshot of the shared display.
///
/// The payload is immutable and reference-counted, so handing a frame
/// to many concurrent readers never copies the image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    data: Bytes,
}

impl EncodedFrame {
    /// Wrap an encoded byte stream.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// A cheap handle to the payload, suitable for a response body.
    pub fn to_bytes(&self) -> Bytes {
        self.data.clone()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Content digest, used for logging and unchanged-frame detection.
    pub fn digest(&self) -> blake3::Hash {
        blake3::hash(&self.data)
    }
}

// ── FrameBuffer ──────────────────────────────────────────────────

/// Process-wide holder of the latest [`EncodedFrame`].
///
/// Backed by a `tokio::sync::watch` channel: [`publish`](Self::publish)
/// swaps the stored handle under the channel's lock and
/// [`read`](Self::read) clones the handle out under the same lock, so
/// a reader sees either the empty state or a whole frame. There is no
/// history; intermediate frames a slow reader never saw are dropped.
#[derive(Debug)]
pub struct FrameBuffer {
    tx: watch::Sender<Option<EncodedFrame>>,
    published: AtomicU64,
}

impl FrameBuffer {
    /// An empty buffer. Reads return `None` until the first publish.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            published: AtomicU64::new(0),
        }
    }

    /// Replace the stored frame. Last write wins.
    pub fn publish(&self, frame: EncodedFrame) {
        self.tx.send_replace(Some(frame));
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// The latest published frame, or `None` before the first capture.
    pub fn read(&self) -> Option<EncodedFrame> {
        self.tx.borrow().clone()
    }

    /// Number of frames published since process start.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Size in bytes of the frame currently held (0 when empty).
    pub fn current_len(&self) -> usize {
        self.tx.borrow().as_ref().map_or(0, EncodedFrame::len)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────
