//! The feature fusion engine: the single point of contact between raw
//! sensor streams and the scoring model.
//!
//! Owns one buffer per modality for the currently active session. Producers
//! push typed records; the consumer calls `extract` at its own cadence and
//! receives one fixed-schema feature vector no matter which modalities have
//! data.

pub mod scaler;

use crate::buffer::{BoundedChunkQueue, EventBuffer, FrameBuffer};
use crate::capture::events::{AudioChunk, KeyEvent, LandmarkFrame, MouseEvent};
use crate::config::Config;
use crate::error::Result;
use crate::features::{audio, behavioral, visual};
use crate::schema::FeatureVector;
use chrono::{Duration, Utc};
use scaler::StandardScaler;

/// Default extraction window in seconds.
pub const DEFAULT_WINDOW_SECS: f64 = 5.0;

/// Buffers and fuses the four modality streams of one active session.
pub struct FusionEngine {
    window: Duration,
    window_secs: f64,
    frames: FrameBuffer,
    key_events: EventBuffer<KeyEvent>,
    mouse_events: EventBuffer<MouseEvent>,
    audio_chunks: BoundedChunkQueue,
    scaler: Option<StandardScaler>,
}

impl FusionEngine {
    pub fn new(window_secs: f64, audio_queue_capacity: usize) -> Self {
        Self {
            window: Duration::microseconds((window_secs * 1e6) as i64),
            window_secs,
            frames: FrameBuffer::new(),
            key_events: EventBuffer::new(),
            mouse_events: EventBuffer::new(),
            audio_chunks: BoundedChunkQueue::new(audio_queue_capacity),
            scaler: None,
        }
    }

    /// Build an engine from the configured window and queue capacity.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.window_secs, config.audio_queue_capacity)
    }

    /// Extraction window length in seconds.
    pub fn window_secs(&self) -> f64 {
        self.window_secs
    }

    /// Window horizon sampled at the moment of the call.
    ///
    /// Each modality trims against its own independently sampled "now";
    /// buffers are not synchronized to one global tick. The bounded skew
    /// between modalities under rapid successive pushes is accepted.
    fn horizon(&self) -> chrono::DateTime<Utc> {
        Utc::now() - self.window
    }

    pub fn push_frame(&self, frame: LandmarkFrame) {
        self.frames.push(frame);
        self.frames.trim(self.horizon());
    }

    pub fn push_frames(&self, frames: impl IntoIterator<Item = LandmarkFrame>) {
        self.frames.extend(frames);
        self.frames.trim(self.horizon());
    }

    pub fn push_key_events(&self, events: impl IntoIterator<Item = KeyEvent>) {
        self.key_events.extend(events);
        self.key_events.trim(self.horizon());
    }

    pub fn push_mouse_events(&self, events: impl IntoIterator<Item = MouseEvent>) {
        self.mouse_events.extend(events);
        self.mouse_events.trim(self.horizon());
    }

    pub fn push_audio_chunk(&self, chunk: AudioChunk) {
        self.audio_chunks.push(chunk);
        self.audio_chunks.trim(self.horizon());
    }

    /// Extract the fused feature vector from the current buffered window.
    ///
    /// Every call returns the full fixed-size schema: modalities with no
    /// usable data contribute their canonical zero sets.
    pub fn extract(&self) -> FeatureVector {
        let frames = self.frames.snapshot();
        let keys = self.key_events.peek();
        let mice = self.mouse_events.peek();
        let chunks = self.audio_chunks.snapshot();

        tracing::debug!(
            frames = frames.len(),
            key_events = keys.len(),
            mouse_events = mice.len(),
            audio_chunks = chunks.len(),
            "extracting fused features"
        );

        FeatureVector::fuse(
            visual::extract_visual_features(&frames, self.window_secs),
            behavioral::extract_behavioral_features(&keys, &mice, self.window_secs),
            audio::extract_audio_features(&chunks),
        )
    }

    /// Extracted values as a numeric array in schema (ascending key) order.
    pub fn extract_array(&self) -> Result<Vec<f64>> {
        self.extract().to_array()
    }

    /// Fit the z-score scaler from a training feature matrix.
    pub fn fit_scaler(&mut self, matrix: &[Vec<f64>]) -> Result<()> {
        self.scaler = Some(StandardScaler::fit(matrix)?);
        Ok(())
    }

    /// Install an already-fitted scaler (e.g. from a loaded model bundle).
    pub fn set_scaler(&mut self, scaler: Option<StandardScaler>) {
        self.scaler = scaler;
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    /// Standardize one feature row.
    ///
    /// With no fitted scaler this is a passthrough, not an error: the live
    /// pipeline keeps functioning pre-calibration.
    pub fn normalize(&self, row: Vec<f64>) -> Result<Vec<f64>> {
        match &self.scaler {
            Some(scaler) => scaler.transform(&row),
            None => Ok(row),
        }
    }

    /// Standardize a full matrix (passthrough when unfitted).
    pub fn normalize_matrix(&self, matrix: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>> {
        match &self.scaler {
            Some(scaler) => scaler.transform_matrix(&matrix),
            None => Ok(matrix),
        }
    }

    /// Reset all four modality buffers. Used at session boundaries.
    pub fn clear_buffers(&self) {
        self.frames.clear();
        self.key_events.clear();
        self.mouse_events.clear();
        self.audio_chunks.clear();
        tracing::info!("fusion buffers cleared");
    }

    /// Chunks evicted from the audio queue under backpressure.
    pub fn audio_dropped_count(&self) -> u64 {
        self.audio_chunks.dropped_count()
    }

    /// Buffered record counts (frames, key events, mouse events, chunks).
    pub fn buffer_depths(&self) -> (usize, usize, usize, usize) {
        (
            self.frames.len(),
            self.key_events.len(),
            self.mouse_events.len(),
            self.audio_chunks.len(),
        )
    }
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECS, crate::buffer::chunk_queue::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::events::HeadPose;
    use crate::schema::FEATURE_COUNT;
    use chrono::Duration as ChronoDuration;
    use pretty_assertions::assert_eq;

    fn face_frame(avg_ear: f64) -> LandmarkFrame {
        LandmarkFrame {
            timestamp: Utc::now(),
            landmarks: vec![[0.5, 0.5, 0.0]; 468],
            left_ear: avg_ear,
            right_ear: avg_ear,
            avg_ear,
            blink_detected: false,
            head_pose: HeadPose::default(),
            face_detected: true,
        }
    }

    #[test]
    fn test_from_config_uses_configured_window() {
        let mut config = Config::default();
        config.window_secs = 2.5;
        config.audio_queue_capacity = 3;
        let engine = FusionEngine::from_config(&config);
        assert_eq!(engine.window_secs(), 2.5);

        // Capacity 3: the fourth chunk evicts the oldest.
        for _ in 0..4 {
            engine.push_audio_chunk(AudioChunk::new(vec![0.1; 160], 16_000));
        }
        let (_, _, _, chunks) = engine.buffer_depths();
        assert_eq!(chunks, 3);
        assert_eq!(engine.audio_dropped_count(), 1);
    }

    #[test]
    fn test_fixed_schema_law_all_buffers_empty() {
        let engine = FusionEngine::default();
        let vector = engine.extract();
        assert_eq!(vector.len(), FEATURE_COUNT);
        assert_eq!(engine.extract_array().unwrap().len(), FEATURE_COUNT);
    }

    #[test]
    fn test_degraded_modalities_keep_schema() {
        // One valid frame, silent audio, no behavioral events.
        let engine = FusionEngine::default();
        engine.push_frame(face_frame(0.30));
        engine.push_audio_chunk(AudioChunk::new(vec![0.0; 16_000], 16_000));

        let vector = engine.extract();
        assert_eq!(vector.len(), FEATURE_COUNT);
        assert_eq!(vector.get("vis_ear_mean"), Some(0.30));
        assert_eq!(vector.get("vis_face_presence"), Some(1.0));
        // Behavioral and audio collapse to their canonical zero sets.
        assert_eq!(vector.get("beh_key_count"), Some(0.0));
        assert_eq!(vector.get("beh_mouse_distance"), Some(0.0));
        assert_eq!(vector.get("aud_rms"), Some(0.0));
    }

    #[test]
    fn test_array_order_matches_schema() {
        let engine = FusionEngine::default();
        engine.push_frame(face_frame(0.42));
        let vector = engine.extract();
        let array = vector.to_array().unwrap();
        let idx = crate::schema::index_of("vis_ear_mean").unwrap();
        assert_eq!(array[idx], 0.42);
    }

    #[test]
    fn test_push_trims_own_buffer() {
        let engine = FusionEngine::new(1.0, 50);
        let mut old = KeyEvent::press("a");
        old.timestamp = Utc::now() - ChronoDuration::seconds(30);
        engine.push_key_events([old, KeyEvent::press("b")]);
        let (_, keys, _, _) = engine.buffer_depths();
        assert_eq!(keys, 1);
    }

    #[test]
    fn test_normalize_without_scaler_is_passthrough() {
        let engine = FusionEngine::default();
        let row = vec![1.0; FEATURE_COUNT];
        assert_eq!(engine.normalize(row.clone()).unwrap(), row);
    }

    #[test]
    fn test_normalize_with_fitted_scaler() {
        let mut engine = FusionEngine::default();
        let matrix = vec![vec![0.0; FEATURE_COUNT], vec![2.0; FEATURE_COUNT]];
        engine.fit_scaler(&matrix).unwrap();
        let scaled = engine.normalize(vec![1.0; FEATURE_COUNT]).unwrap();
        // 1.0 is the column mean everywhere.
        assert!(scaled.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_clear_buffers_resets_all() {
        let engine = FusionEngine::default();
        engine.push_frame(face_frame(0.3));
        engine.push_key_events([KeyEvent::press("a")]);
        engine.push_mouse_events([MouseEvent::movement(0.0, 0.0)]);
        engine.push_audio_chunk(AudioChunk::new(vec![0.1; 160], 16_000));
        engine.clear_buffers();
        assert_eq!(engine.buffer_depths(), (0, 0, 0, 0));
    }
}
