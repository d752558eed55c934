//! Thread-safe buffers for multi-rate sensor streams.
//!
//! Backpressure is deliberately asymmetric across modalities:
//!
//! - Audio chunks arrive at a high rate and are loss-tolerant, so they go
//!   through a bounded queue with drop-oldest eviction.
//! - Keystroke and mouse events are low-rate and loss-intolerant within
//!   the window, so their buffers are unbounded between appends and are
//!   periodically trimmed by timestamp.
//! - Landmark frames arrive time-ordered at the camera rate and use a
//!   head-evicting deque.

pub mod chunk_queue;
pub mod event_buffer;
pub mod frame_buffer;

pub use chunk_queue::BoundedChunkQueue;
pub use event_buffer::{EventBuffer, Timestamped};
pub use frame_buffer::FrameBuffer;
