//! Append/drain buffer for discrete input events.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Anything carrying a capture timestamp.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for crate::capture::events::KeyEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for crate::capture::events::MouseEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for crate::capture::events::AudioChunk {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Thread-safe buffer for moderate-rate discrete events.
///
/// Unbounded between appends; the fusion engine trims it against the window
/// horizon after every push batch. `drain` is atomic: callers observe either
/// the full contents or nothing, never a partially cleared buffer.
pub struct EventBuffer<T> {
    inner: Mutex<Vec<T>>,
}

impl<T: Clone + Timestamped> EventBuffer<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append one event. Safe from any producer thread.
    pub fn append(&self, event: T) {
        self.lock().push(event);
    }

    /// Append a batch of events.
    pub fn extend(&self, events: impl IntoIterator<Item = T>) {
        self.lock().extend(events);
    }

    /// Atomically take all buffered events and clear the buffer.
    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.lock())
    }

    /// Copy of the buffered events without clearing.
    pub fn peek(&self) -> Vec<T> {
        self.lock().clone()
    }

    /// Remove all events with timestamp < cutoff. Idempotent: a second call
    /// with the same or an earlier cutoff removes nothing further.
    pub fn trim(&self, cutoff: DateTime<Utc>) {
        self.lock().retain(|e| e.timestamp() >= cutoff);
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

impl<T: Clone + Timestamped> Default for EventBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::events::KeyEvent;
    use chrono::Duration;

    fn key_at(offset_ms: i64) -> KeyEvent {
        let mut event = KeyEvent::press("a");
        event.timestamp = Utc::now() + Duration::milliseconds(offset_ms);
        event
    }

    #[test]
    fn test_drain_clears_atomically() {
        let buffer = EventBuffer::new();
        buffer.append(key_at(0));
        buffer.append(key_at(10));
        let drained = buffer.drain();
        assert_eq!(drained.len(), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_peek_does_not_clear() {
        let buffer = EventBuffer::new();
        buffer.append(key_at(0));
        assert_eq!(buffer.peek().len(), 1);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_trim_idempotence() {
        let buffer = EventBuffer::new();
        buffer.append(key_at(-5_000));
        buffer.append(key_at(0));
        let cutoff = Utc::now() - Duration::seconds(2);

        buffer.trim(cutoff);
        assert_eq!(buffer.len(), 1);
        for event in buffer.peek() {
            assert!(event.timestamp >= cutoff);
        }

        // Second identical trim removes nothing further.
        buffer.trim(cutoff);
        assert_eq!(buffer.len(), 1);

        // An earlier cutoff also removes nothing.
        buffer.trim(cutoff - Duration::seconds(10));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_concurrent_appends() {
        let buffer = std::sync::Arc::new(EventBuffer::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let buffer = buffer.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    buffer.append(KeyEvent::press("a"));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(buffer.len(), 400);
    }
}
