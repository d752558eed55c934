//! Bounded drop-oldest queue for audio chunks.

use crate::capture::events::AudioChunk;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Default queue capacity (chunks).
pub const DEFAULT_CAPACITY: usize = 50;

/// Fixed-capacity queue for high-rate audio chunks.
///
/// `push` never blocks the producer: when the queue is at capacity the
/// oldest chunk is evicted before the new one is enqueued, favoring
/// freshness over completeness. Evictions are counted as a policy outcome,
/// not surfaced as errors.
pub struct BoundedChunkQueue {
    inner: Mutex<VecDeque<AudioChunk>>,
    available: Condvar,
    capacity: usize,
    dropped: AtomicU64,
}

impl BoundedChunkQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<AudioChunk>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue a chunk, evicting the oldest entry if at capacity.
    pub fn push(&self, chunk: AudioChunk) {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(total_dropped = total, "audio queue full, dropped oldest chunk");
        }
        queue.push_back(chunk);
        drop(queue);
        self.available.notify_one();
    }

    /// Dequeue the next chunk without waiting.
    pub fn pop_nonblocking(&self) -> Option<AudioChunk> {
        self.lock().pop_front()
    }

    /// Dequeue the next chunk, waiting up to `timeout` for one to arrive.
    pub fn pop_blocking(&self, timeout: Duration) -> Option<AudioChunk> {
        let queue = self.lock();
        let (mut queue, _timed_out) = self
            .available
            .wait_timeout_while(queue, timeout, |q| q.is_empty())
            .unwrap_or_else(|e| e.into_inner());
        queue.pop_front()
    }

    /// Take every buffered chunk in arrival order.
    pub fn drain(&self) -> Vec<AudioChunk> {
        self.lock().drain(..).collect()
    }

    /// Copy of the buffered chunks, oldest first, without clearing.
    pub fn snapshot(&self) -> Vec<AudioChunk> {
        self.lock().iter().cloned().collect()
    }

    /// Remove chunks older than `cutoff`. Idempotent.
    pub fn trim(&self, cutoff: chrono::DateTime<chrono::Utc>) {
        let mut queue = self.lock();
        while queue.front().map_or(false, |c| c.timestamp < cutoff) {
            queue.pop_front();
        }
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

    /// Total chunks evicted under backpressure since creation.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for BoundedChunkQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
