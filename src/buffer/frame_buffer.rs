//! Rolling time-window buffer for landmark frames.

use crate::capture::events::LandmarkFrame;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Append-at-tail, evict-from-head buffer for periodic visual frames.
///
/// Frames arrive already time-ordered from the camera adapter, so trimming
/// only ever pops from the head (O(1) amortized eviction).
pub struct FrameBuffer {
    inner: Mutex<VecDeque<LandmarkFrame>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LandmarkFrame>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append one frame at the tail.
    pub fn push(&self, frame: LandmarkFrame) {
        self.lock().push_back(frame);
    }

    /// Append a batch of frames.
    pub fn extend(&self, frames: impl IntoIterator<Item = LandmarkFrame>) {
        self.lock().extend(frames);
    }

    /// Evict frames older than `cutoff` from the head. Idempotent.
    pub fn trim(&self, cutoff: DateTime<Utc>) {
        let mut frames = self.lock();
        while frames.front().map_or(false, |f| f.timestamp < cutoff) {
            frames.pop_front();
        }
    }

    /// Copy of the buffered frames, oldest first.
    pub fn snapshot(&self) -> Vec<LandmarkFrame> {
        self.lock().iter().cloned().collect()
    }

    /// Atomically take all buffered frames.
    pub fn drain(&self) -> Vec<LandmarkFrame> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
