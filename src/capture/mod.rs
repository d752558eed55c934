//! Sensor capture: typed signal records, background adapters, and the
//! session that ties the four modalities together.

pub mod adapter;
pub mod events;
pub mod session;
pub mod synthetic;

pub use adapter::{SensorAdapter, SignalSource};
pub use events::{
    AudioChunk, HeadPose, KeyEvent, KeyEventKind, LandmarkFrame, MouseButton, MouseEvent,
    MouseEventKind, SensorSignal,
};
pub use session::CaptureSession;
pub use synthetic::SyntheticSource;
