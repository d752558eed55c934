//! End-to-end pipeline tests: synthetic sensors through capture, fusion,
//! and scoring.

use cognisense::capture::{
    AudioChunk, CaptureSession, KeyEvent, LandmarkFrame, MouseEvent, SensorAdapter, SensorSignal,
    SyntheticSource,
};
use cognisense::config::{Config, ModalityConfig};
use cognisense::fusion::scaler::StandardScaler;
use cognisense::fusion::FusionEngine;
use cognisense::schema;
use cognisense::scoring::ScoringService;
use cognisense::types::LoadLevel;
use cognisense::{EnsembleModel, EnsembleWeights, FeatureVector, FEATURE_COUNT};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

fn face_frame(avg_ear: f64) -> LandmarkFrame {
    LandmarkFrame {
        timestamp: chrono::Utc::now(),
        landmarks: vec![[0.5, 0.5, 0.0]; 468],
        left_ear: avg_ear,
        right_ear: avg_ear,
        avg_ear,
        blink_detected: false,
        head_pose: Default::default(),
        face_detected: true,
    }
}

fn scripted_session() -> CaptureSession {
    let video = SyntheticSource::new(vec![
        SensorSignal::Frame(face_frame(0.30)),
        SensorSignal::Frame(face_frame(0.28)),
    ]);
    let keyboard = SyntheticSource::new(vec![
        SensorSignal::Key(KeyEvent::press("h")),
        SensorSignal::Key(KeyEvent::release("h")),
        SensorSignal::Key(KeyEvent::press("i")),
        SensorSignal::Key(KeyEvent::release("i")),
    ]);
    let mouse = SyntheticSource::new(vec![
        SensorSignal::Mouse(MouseEvent::movement(0.0, 0.0)),
        SensorSignal::Mouse(MouseEvent::movement(30.0, 40.0)),
    ]);
    let audio = SyntheticSource::new(vec![SensorSignal::Audio(AudioChunk::new(
        (0..16_000).map(|i| (i as f32 * 0.05).sin() * 0.2).collect(),
        16_000,
    ))]);
    CaptureSession::new(vec![
        SensorAdapter::new("video", Box::new(video)),
        SensorAdapter::new("keyboard", Box::new(keyboard)),
        SensorAdapter::new("mouse", Box::new(mouse)),
        SensorAdapter::new("audio", Box::new(audio)),
    ])
}

fn pump_until(session: &CaptureSession, engine: &FusionEngine, expected: usize) -> usize {
    let mut routed = 0;
    let deadline = Instant::now() + Duration::from_secs(3);
    while routed < expected && Instant::now() < deadline {
        routed += session.pump_into(engine);
        std::thread::sleep(Duration::from_millis(5));
    }
    routed
}

/// Three well-separated clusters across the full schema width.
fn training_matrix() -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut x = Vec::new();
    let mut y = Vec::new();
    for i in 0..8 {
        let jitter = (i % 4) as f64 * 0.05;
        x.push(vec![0.0 + jitter; FEATURE_COUNT]);
        y.push(0);
        x.push(vec![2.0 + jitter; FEATURE_COUNT]);
        y.push(1);
        x.push(vec![4.0 + jitter; FEATURE_COUNT]);
        y.push(2);
    }
    (x, y)
}

#[test]
fn synthetic_sensors_flow_into_fallback_prediction() {
    let service = ScoringService::new(FusionEngine::default());
    let mut session = scripted_session();
    assert_eq!(session.start_all().unwrap(), 4);

    let routed = pump_until(&session, service.engine(), 9);
    session.stop_all();
    assert_eq!(routed, 9);

    let vector = service.engine().extract();
    assert_eq!(vector.len(), FEATURE_COUNT);
    assert_eq!(vector.get("beh_key_count"), Some(2.0));
    assert!(vector.get("vis_face_presence") > Some(0.9));
    assert!(vector.get("aud_rms").unwrap_or(0.0) > 0.0);

    // No trained model: the fallback serves a degraded but usable result.
    let result = service.score_now().unwrap();
    assert!(result.degraded);
    assert!(result.per_model.is_none());
    assert!((result.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!((result.modality_scores.sum() - 1.0).abs() < 1e-6);
}

#[test]
fn trained_bundle_round_trips_through_scoring_service() {
    let (x, y) = training_matrix();
    let mut model = EnsembleModel::new(EnsembleWeights::default()).unwrap();
    model
        .train(&x, &y, schema::feature_names().to_vec())
        .unwrap();
    let scaler = StandardScaler::fit(&x).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ensemble.json");
    model.save(&path, Some(&scaler)).unwrap();

    let mut service = ScoringService::new(FusionEngine::default());
    service.load_model(&path).unwrap();
    assert!(service.has_model());
    // The bundle's scaler is installed alongside the model.
    assert!(service.engine().scaler().is_some());

    let result = service.score_now().unwrap();
    assert!(!result.degraded);
    assert!(result.per_model.is_some());
    assert!((result.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    assert!(result.confidence >= result.probabilities.iter().cloned().fold(0.0, f64::max) - 1e-12);
}

#[test]
fn config_driven_service_runs_scoring_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.window_secs = 3.0;
    config.audio_queue_capacity = 8;
    config.scoring_interval = Duration::from_millis(20);
    config.model_path = dir.path().join("models").join("ensemble.json");
    config.modalities = ModalityConfig {
        video: true,
        keyboard: true,
        mouse: true,
        audio: false,
    };

    let (x, y) = training_matrix();
    let mut model = EnsembleModel::new(EnsembleWeights::default()).unwrap();
    model
        .train(&x, &y, schema::feature_names().to_vec())
        .unwrap();
    model.save(&config.model_path, None).unwrap();

    let service = cognisense::ScoringService::from_config(&config).unwrap();
    assert!(service.has_model());
    assert_eq!(service.engine().window_secs(), 3.0);

    // The disabled audio adapter never makes it into the session.
    let mut session = scripted_session_from_config(&config.modalities);
    assert_eq!(session.start_all().unwrap(), 3);

    // Let the adapters land their scripts before the cycles run.
    std::thread::sleep(Duration::from_millis(100));
    let results = service.run_session(&session, 3).unwrap();
    session.stop_all();

    assert_eq!(results.len(), 3);
    for result in &results {
        assert!(!result.degraded);
        assert!((result.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }
    let (_, _, _, chunks) = service.engine().buffer_depths();
    assert_eq!(chunks, 0);
}

fn scripted_session_from_config(modalities: &ModalityConfig) -> CaptureSession {
    let video = SyntheticSource::new(vec![SensorSignal::Frame(face_frame(0.30))]);
    let keyboard = SyntheticSource::new(vec![SensorSignal::Key(KeyEvent::press("a"))]);
    let mouse = SyntheticSource::new(vec![SensorSignal::Mouse(MouseEvent::movement(1.0, 1.0))]);
    let audio = SyntheticSource::new(vec![SensorSignal::Audio(AudioChunk::new(
        vec![0.1; 160],
        16_000,
    ))]);
    CaptureSession::with_config(
        vec![
            SensorAdapter::new("video", Box::new(video)),
            SensorAdapter::new("keyboard", Box::new(keyboard)),
            SensorAdapter::new("mouse", Box::new(mouse)),
            SensorAdapter::new("audio", Box::new(audio)),
        ],
        modalities,
    )
}

#[test]
fn missing_bundle_leaves_fallback_serving() {
    let dir = tempfile::tempdir().unwrap();
    let mut service = ScoringService::new(FusionEngine::default());
    service.load_model(&dir.path().join("absent.json")).unwrap();
    assert!(!service.has_model());
    assert!(service.score_now().unwrap().degraded);
}

#[test]
fn fallback_rules_reach_high_load() {
    let mut values = BTreeMap::new();
    for name in schema::feature_names() {
        values.insert(name.clone(), 0.0);
    }
    values.insert("vis_blink_rate".into(), 30.0);
    values.insert("beh_error_rate".into(), 0.3);
    values.insert("aud_pitch_variance".into(), 900.0);
    let vector = FeatureVector::from_values(values).unwrap();

    let result = cognisense::scoring::fallback::FallbackScorer::new().score(&vector);
    assert_eq!(result.load_level, LoadLevel::High);
    assert!(result.degraded);
}

#[test]
fn session_with_dead_camera_still_scores() {
    let keyboard = SyntheticSource::new(vec![
        SensorSignal::Key(KeyEvent::press("a")),
        SensorSignal::Key(KeyEvent::release("a")),
    ]);
    let mut session = CaptureSession::new(vec![
        SensorAdapter::new("video", Box::new(SyntheticSource::failing_open("no camera"))),
        SensorAdapter::new("keyboard", Box::new(keyboard)),
    ]);
    assert_eq!(session.start_all().unwrap(), 1);

    let service = ScoringService::new(FusionEngine::default());
    pump_until(&session, service.engine(), 2);
    session.stop_all();

    let vector = service.engine().extract();
    // The dead modality contributes its canonical zero set.
    assert_eq!(vector.get("vis_face_presence"), Some(0.0));
    assert_eq!(vector.get("beh_key_count"), Some(2.0));
    assert!(service.score_now().is_ok());
}
