//! Visual feature extraction from face landmark frames.
//!
//! Computes blink statistics, eye aspect ratio metrics, eyebrow position,
//! mouth aspect ratio, head pose dynamics, and gaze deviation over a window
//! of `LandmarkFrame` records.

use crate::capture::events::LandmarkFrame;
use crate::features::{mean, std_dev};
use std::collections::BTreeMap;

/// Canonical visual feature keys, in declaration order.
pub const KEYS: [&str; 18] = [
    "blink_count",
    "blink_rate",
    "ear_mean",
    "ear_std",
    "ear_min",
    "ear_range",
    "eyebrow_dist_mean",
    "eyebrow_dist_std",
    "mar_mean",
    "mar_std",
    "head_pitch_mean",
    "head_pitch_std",
    "head_yaw_std",
    "head_roll_std",
    "head_movement",
    "gaze_deviation_mean",
    "gaze_deviation_std",
    "face_presence",
];

// Face-mesh landmark indices.
const LEFT_EYEBROW_IDX: [usize; 5] = [276, 283, 282, 295, 300];
const RIGHT_EYEBROW_IDX: [usize; 5] = [46, 53, 52, 65, 70];
const LEFT_EYE_IDX: [usize; 6] = [362, 385, 387, 263, 373, 380];
const RIGHT_EYE_IDX: [usize; 6] = [33, 160, 158, 133, 153, 144];
const MOUTH_TOP: usize = 13;
const MOUTH_BOTTOM: usize = 14;
const MOUTH_LEFT: usize = 78;
const MOUTH_RIGHT: usize = 308;
const LEFT_IRIS_IDX: [usize; 5] = [468, 469, 470, 471, 472];
const RIGHT_IRIS_IDX: [usize; 5] = [473, 474, 475, 476, 477];

/// Minimum landmark count for gaze features (iris refinement present).
const IRIS_LANDMARK_COUNT: usize = 478;

/// Extract visual features from a window of landmark frames.
///
/// Frames without a detected face are filtered out; if none remain the
/// canonical zero set is returned.
pub fn extract_visual_features(
    frames: &[LandmarkFrame],
    window_secs: f64,
) -> BTreeMap<&'static str, f64> {
    let valid: Vec<&LandmarkFrame> = frames.iter().filter(|f| f.face_detected).collect();
    if valid.is_empty() {
        tracing::debug!("no valid face frames in window");
        return zero_features();
    }

    // Blink statistics
    let blink_count = valid.iter().filter(|f| f.blink_detected).count() as f64;
    let blink_rate = if window_secs > 0.0 {
        (blink_count / window_secs) * 60.0
    } else {
        0.0
    };

    // Eye aspect ratio
    let ears: Vec<f64> = valid.iter().map(|f| f.avg_ear).collect();
    let ear_mean = mean(&ears);
    let ear_std = std_dev(&ears);
    let ear_min = ears.iter().cloned().fold(f64::INFINITY, f64::min);
    let ear_max = ears.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let ear_range = ear_max - ear_min;

    // Eyebrow distance
    let brow_dists: Vec<f64> = valid
        .iter()
        .map(|f| eyebrow_eye_distance(&f.landmarks))
        .collect();

    // Mouth aspect ratio
    let mars: Vec<f64> = valid
        .iter()
        .map(|f| mouth_aspect_ratio(&f.landmarks))
        .collect();

    // Head pose dynamics
    let pitches: Vec<f64> = valid.iter().map(|f| f.head_pose.pitch).collect();
    let yaws: Vec<f64> = valid.iter().map(|f| f.head_pose.yaw).collect();
    let rolls: Vec<f64> = valid.iter().map(|f| f.head_pose.roll).collect();

    // Head movement velocity: mean angular change per frame.
    let head_movement = if pitches.len() > 1 {
        let steps: Vec<f64> = pitches
            .windows(2)
            .zip(yaws.windows(2))
            .map(|(p, y)| {
                let dp = p[1] - p[0];
                let dy = y[1] - y[0];
                (dp * dp + dy * dy).sqrt()
            })
            .collect();
        mean(&steps)
    } else {
        0.0
    };

    // Gaze deviation (iris landmarks, zero when refinement is absent)
    let gaze_devs: Vec<f64> = valid.iter().map(|f| gaze_deviation(&f.landmarks)).collect();

    let face_presence = valid.len() as f64 / frames.len().max(1) as f64;

    let features = BTreeMap::from([
        ("blink_count", blink_count),
        ("blink_rate", blink_rate),
        ("ear_mean", ear_mean),
        ("ear_std", ear_std),
        ("ear_min", ear_min),
        ("ear_range", ear_range),
        ("eyebrow_dist_mean", mean(&brow_dists)),
        ("eyebrow_dist_std", std_dev(&brow_dists)),
        ("mar_mean", mean(&mars)),
        ("mar_std", std_dev(&mars)),
        ("head_pitch_mean", mean(&pitches)),
        ("head_pitch_std", std_dev(&pitches)),
        ("head_yaw_std", std_dev(&yaws)),
        ("head_roll_std", std_dev(&rolls)),
        ("head_movement", head_movement),
        ("gaze_deviation_mean", mean(&gaze_devs)),
        ("gaze_deviation_std", std_dev(&gaze_devs)),
        ("face_presence", face_presence),
    ]);
    tracing::debug!(count = features.len(), "extracted visual features");
    features
}

/// The canonical all-zero visual feature set.
pub fn zero_features() -> BTreeMap<&'static str, f64> {
    KEYS.iter().map(|&k| (k, 0.0)).collect()
}

fn point(landmarks: &[[f64; 3]], idx: usize) -> [f64; 3] {
    landmarks.get(idx).copied().unwrap_or([0.0; 3])
}

fn dist3(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Mouth Aspect Ratio: vertical lip gap over horizontal mouth width.
fn mouth_aspect_ratio(landmarks: &[[f64; 3]]) -> f64 {
    let vertical = dist3(point(landmarks, MOUTH_TOP), point(landmarks, MOUTH_BOTTOM));
    let horizontal = dist3(point(landmarks, MOUTH_LEFT), point(landmarks, MOUTH_RIGHT));
    if horizontal == 0.0 {
        0.0
    } else {
        vertical / horizontal
    }
}

/// Average vertical distance between eyebrow and eye center.
fn eyebrow_eye_distance(landmarks: &[[f64; 3]]) -> f64 {
    let mean_y = |indices: &[usize]| -> f64 {
        mean(&indices.iter().map(|&i| point(landmarks, i)[1]).collect::<Vec<_>>())
    };
    let left = (mean_y(&LEFT_EYE_IDX) - mean_y(&LEFT_EYEBROW_IDX)).abs();
    let right = (mean_y(&RIGHT_EYE_IDX) - mean_y(&RIGHT_EYEBROW_IDX)).abs();
    (left + right) / 2.0
}

/// Gaze deviation: distance of the iris center from the eye center,
/// averaged over both eyes. Zero when iris landmarks are unavailable.
fn gaze_deviation(landmarks: &[[f64; 3]]) -> f64 {
    if landmarks.len() < IRIS_LANDMARK_COUNT {
        return 0.0;
    }
    let center_xy = |indices: &[usize]| -> [f64; 2] {
        let xs: Vec<f64> = indices.iter().map(|&i| point(landmarks, i)[0]).collect();
        let ys: Vec<f64> = indices.iter().map(|&i| point(landmarks, i)[1]).collect();
        [mean(&xs), mean(&ys)]
    };
    let dev = |iris: [f64; 2], eye: [f64; 2]| -> f64 {
        let dx = iris[0] - eye[0];
        let dy = iris[1] - eye[1];
        (dx * dx + dy * dy).sqrt()
    };
    let left = dev(center_xy(&LEFT_IRIS_IDX), center_xy(&LEFT_EYE_IDX));
    let right = dev(center_xy(&RIGHT_IRIS_IDX), center_xy(&RIGHT_EYE_IDX));
    (left + right) / 2.0
}
