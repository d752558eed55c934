//! Event and frame types produced by the sensor adapters.
//!
//! Each modality has its own record type. A frame where no face was found
//! is still a valid `LandmarkFrame` with `face_detected = false`; absence
//! of a face is data, not absence of a record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A block of mono audio samples from the microphone adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioChunk {
    /// Timestamp at which the chunk was captured
    pub timestamp: DateTime<Utc>,
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Chunk duration in seconds
    pub duration_secs: f64,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        let duration_secs = samples.len() as f64 / sample_rate.max(1) as f64;
        Self {
            timestamp: Utc::now(),
            samples,
            sample_rate,
            duration_secs,
        }
    }
}

/// Kind of keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEventKind {
    Press,
    Release,
}

/// A single keyboard event with timing information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Key identity as reported by the listener (e.g. "a", "Key.enter")
    pub key: String,
    /// Press or release
    pub kind: KeyEventKind,
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    /// True for correction keys (backspace, delete)
    pub is_error_key: bool,
}

impl KeyEvent {
    pub fn press(key: impl Into<String>) -> Self {
        let key = key.into();
        let is_error_key = is_error_key(&key);
        Self {
            key,
            kind: KeyEventKind::Press,
            timestamp: Utc::now(),
            is_error_key,
        }
    }

    pub fn release(key: impl Into<String>) -> Self {
        let key = key.into();
        let is_error_key = is_error_key(&key);
        Self {
            key,
            kind: KeyEventKind::Release,
            timestamp: Utc::now(),
            is_error_key,
        }
    }
}

/// Keys counted as error corrections.
fn is_error_key(key: &str) -> bool {
    matches!(key, "Key.backspace" | "Key.delete")
}

/// Kind of mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseEventKind {
    Move,
    Click,
    Scroll,
}

/// Mouse button identity for click events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// A single mouse event: movement, click, or scroll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MouseEvent {
    /// Move, click, or scroll
    pub kind: MouseEventKind,
    /// Cursor position in pixels
    pub x: f64,
    pub y: f64,
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    /// Button identity (click events only)
    pub button: Option<MouseButton>,
    /// True for button-down, false for button-up (click events only)
    pub pressed: bool,
    /// Scroll deltas (scroll events only)
    pub scroll_dx: f64,
    pub scroll_dy: f64,
}

impl MouseEvent {
    pub fn movement(x: f64, y: f64) -> Self {
        Self {
            kind: MouseEventKind::Move,
            x,
            y,
            timestamp: Utc::now(),
            button: None,
            pressed: false,
            scroll_dx: 0.0,
            scroll_dy: 0.0,
        }
    }

    pub fn click(x: f64, y: f64, button: MouseButton, pressed: bool) -> Self {
        Self {
            kind: MouseEventKind::Click,
            x,
            y,
            timestamp: Utc::now(),
            button: Some(button),
            pressed,
            scroll_dx: 0.0,
            scroll_dy: 0.0,
        }
    }

    pub fn scroll(x: f64, y: f64, dx: f64, dy: f64) -> Self {
        Self {
            kind: MouseEventKind::Scroll,
            x,
            y,
            timestamp: Utc::now(),
            button: None,
            pressed: false,
            scroll_dx: dx,
            scroll_dy: dy,
        }
    }
}

/// Head pose angles in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// One sampled video frame after landmark extraction.
///
/// Produced by the landmark collaborator at the configured camera rate.
/// `landmarks` holds 468 face-mesh points, or 478 when iris refinement is
/// available (gaze features use the extra ten).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub timestamp: DateTime<Utc>,
    /// (x, y, z) normalized landmark coordinates
    pub landmarks: Vec<[f64; 3]>,
    /// Left Eye Aspect Ratio
    pub left_ear: f64,
    /// Right Eye Aspect Ratio
    pub right_ear: f64,
    /// Average EAR
    pub avg_ear: f64,
    /// True if EAR fell below the blink threshold
    pub blink_detected: bool,
    /// Estimated head pose
    pub head_pose: HeadPose,
    /// False when no face was found in the frame
    pub face_detected: bool,
}

impl LandmarkFrame {
    /// A frame in which the collaborator found no face.
    pub fn no_face() -> Self {
        Self {
            timestamp: Utc::now(),
            landmarks: Vec::new(),
            left_ear: 0.0,
            right_ear: 0.0,
            avg_ear: 0.0,
            blink_detected: false,
            head_pose: HeadPose::default(),
            face_detected: false,
        }
    }
}

/// Unified signal type carried on the adapter channels.
#[derive(Debug, Clone)]
pub enum SensorSignal {
    Frame(LandmarkFrame),
    Key(KeyEvent),
    Mouse(MouseEvent),
    Audio(AudioChunk),
}

impl SensorSignal {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            SensorSignal::Frame(f) => f.timestamp,
            SensorSignal::Key(e) => e.timestamp,
            SensorSignal::Mouse(e) => e.timestamp,
            SensorSignal::Audio(c) => c.timestamp,
        }
    }
}
