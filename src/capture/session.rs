//! Capture session lifecycle: the four modality adapters as one unit.

use crate::capture::adapter::SensorAdapter;
use crate::capture::events::SensorSignal;
use crate::config::ModalityConfig;
use crate::error::{CoreError, Result};
use crate::fusion::FusionEngine;
use uuid::Uuid;

/// One recording session owning the video, keyboard, mouse, and audio
/// adapters.
///
/// Modalities degrade independently: a source that fails to open is
/// logged and left disabled while the rest of the session runs. Feature
/// extraction fills the silent modality with its canonical zero set.
pub struct CaptureSession {
    id: Uuid,
    adapters: Vec<SensorAdapter>,
    started: bool,
}

impl CaptureSession {
    /// Adapters are conventionally (video, keyboard, mouse, audio), but any
    /// subset works; routing is by signal type, not position.
    pub fn new(adapters: Vec<SensorAdapter>) -> Self {
        Self {
            id: Uuid::new_v4(),
            adapters,
            started: false,
        }
    }

    /// Like `new`, but keeps only the adapters whose modality the
    /// configuration enables.
    pub fn with_config(adapters: Vec<SensorAdapter>, modalities: &ModalityConfig) -> Self {
        let adapters = adapters
            .into_iter()
            .filter(|adapter| {
                let keep = modalities.enabled(adapter.modality());
                if !keep {
                    tracing::info!(modality = adapter.modality(), "modality disabled by config");
                }
                keep
            })
            .collect();
        Self::new(adapters)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Start every adapter, returning how many came up.
    ///
    /// `SensorUnavailable` is a per-modality condition and is absorbed
    /// here with a warning; any other failure aborts the start.
    pub fn start_all(&mut self) -> Result<usize> {
        if self.started {
            return Err(CoreError::AlreadyRunning("session"));
        }
        let mut active = 0;
        for adapter in &mut self.adapters {
            match adapter.start() {
                Ok(()) => active += 1,
                Err(CoreError::SensorUnavailable { modality, reason }) => {
                    tracing::warn!(modality, %reason, "modality disabled for this session");
                }
                Err(other) => return Err(other),
            }
        }
        self.started = true;
        tracing::info!(session = %self.id, active, total = self.adapters.len(), "capture session started");
        Ok(active)
    }

    /// Stop every adapter. Safe when never started, and safe twice.
    pub fn stop_all(&mut self) {
        for adapter in &mut self.adapters {
            adapter.stop();
        }
        if self.started {
            tracing::info!(session = %self.id, "capture session stopped");
        }
        self.started = false;
    }

    /// How many adapters are currently pumping.
    pub fn active_count(&self) -> usize {
        self.adapters.iter().filter(|a| a.is_running()).count()
    }

    /// Drain every adapter channel into the fusion engine's buffers.
    ///
    /// Returns the number of signals routed. Called at the consumer's own
    /// cadence; the bounded channels absorb the interval in between.
    pub fn pump_into(&self, engine: &FusionEngine) -> usize {
        let mut routed = 0;
        for adapter in &self.adapters {
            for signal in adapter.drain() {
                match signal {
                    SensorSignal::Frame(frame) => engine.push_frame(frame),
                    SensorSignal::Key(event) => engine.push_key_events([event]),
                    SensorSignal::Mouse(event) => engine.push_mouse_events([event]),
                    SensorSignal::Audio(chunk) => engine.push_audio_chunk(chunk),
                }
                routed += 1;
            }
        }
        routed
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::events::{AudioChunk, KeyEvent, LandmarkFrame, MouseEvent};
    use crate::capture::synthetic::SyntheticSource;
    use std::time::{Duration, Instant};

    fn scripted_session() -> CaptureSession {
        let video = SyntheticSource::new(vec![SensorSignal::Frame(LandmarkFrame::no_face())]);
        let keyboard = SyntheticSource::new(vec![
            SensorSignal::Key(KeyEvent::press("a")),
            SensorSignal::Key(KeyEvent::release("a")),
        ]);
        let mouse = SyntheticSource::new(vec![SensorSignal::Mouse(MouseEvent::movement(5.0, 5.0))]);
        let audio = SyntheticSource::new(vec![SensorSignal::Audio(AudioChunk::new(
            vec![0.1; 160],
            16_000,
        ))]);
        CaptureSession::new(vec![
            SensorAdapter::new("video", Box::new(video)),
            SensorAdapter::new("keyboard", Box::new(keyboard)),
            SensorAdapter::new("mouse", Box::new(mouse)),
            SensorAdapter::new("audio", Box::new(audio)),
        ])
    }

    #[test]
    fn test_session_routes_all_modalities() {
        let mut session = scripted_session();
        assert_eq!(session.start_all().unwrap(), 4);

        let engine = FusionEngine::default();
        let mut routed = 0;
        let deadline = Instant::now() + Duration::from_secs(2);
        while routed < 5 && Instant::now() < deadline {
            routed += session.pump_into(&engine);
            std::thread::sleep(Duration::from_millis(5));
        }
        session.stop_all();

        assert_eq!(routed, 5);
        assert_eq!(engine.buffer_depths(), (1, 2, 1, 1));
    }

    #[test]
    fn test_failed_modality_disables_only_itself() {
        let mut session = CaptureSession::new(vec![
            SensorAdapter::new("video", Box::new(SyntheticSource::failing_open("no camera"))),
            SensorAdapter::new(
                "keyboard",
                Box::new(SyntheticSource::new(vec![SensorSignal::Key(
                    KeyEvent::press("x"),
                )])),
            ),
        ]);
        assert_eq!(session.start_all().unwrap(), 1);
        session.stop_all();
    }

    #[test]
    fn test_with_config_filters_disabled_modalities() {
        let modalities = ModalityConfig {
            video: false,
            keyboard: true,
            mouse: true,
            audio: false,
        };
        let mut session = CaptureSession::with_config(
            vec![
                SensorAdapter::new("video", Box::new(SyntheticSource::new(vec![]))),
                SensorAdapter::new("keyboard", Box::new(SyntheticSource::new(vec![]))),
                SensorAdapter::new("mouse", Box::new(SyntheticSource::new(vec![]))),
                SensorAdapter::new("audio", Box::new(SyntheticSource::new(vec![]))),
            ],
            &modalities,
        );
        assert_eq!(session.start_all().unwrap(), 2);
        assert_eq!(session.active_count(), 2);
        session.stop_all();
    }

    #[test]
    fn test_double_start_refused() {
        let mut session = scripted_session();
        session.start_all().unwrap();
        assert!(matches!(
            session.start_all(),
            Err(CoreError::AlreadyRunning("session"))
        ));
        session.stop_all();
    }

    #[test]
    fn test_stop_all_idempotent_and_closes_sources() {
        let source = SyntheticSource::new(vec![]);
        let closed = source.closed_flag();
        let mut session = CaptureSession::new(vec![SensorAdapter::new("audio", Box::new(source))]);
        session.stop_all();
        session.start_all().unwrap();
        session.stop_all();
        session.stop_all();
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(session.active_count(), 0);
    }
}
