//! Behavioral feature extraction from keystroke and mouse events.
//!
//! Keystroke dynamics: typing speed, dwell/flight times, error patterns.
//! Mouse dynamics: velocity, acceleration, click patterns, idle detection.
//! All timing is computed from capture timestamps, never content.

use crate::capture::events::{KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use crate::features::{mean, std_dev};
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Canonical keystroke feature keys.
pub const KEYSTROKE_KEYS: [&str; 9] = [
    "wpm",
    "key_count",
    "dwell_mean",
    "dwell_std",
    "flight_mean",
    "flight_std",
    "error_rate",
    "burst_rate",
    "pause_count",
];

/// Canonical mouse feature keys.
pub const MOUSE_KEYS: [&str; 11] = [
    "mouse_distance",
    "mouse_velocity_mean",
    "mouse_velocity_std",
    "mouse_acceleration_mean",
    "click_count",
    "click_rate",
    "left_click_ratio",
    "scroll_total",
    "direction_changes",
    "idle_time",
    "movement_straightness",
];

/// Flight gaps above this are counted as pauses (seconds).
const PAUSE_THRESHOLD_SECS: f64 = 1.0;

/// Movement gaps above this count toward idle time (seconds).
const IDLE_THRESHOLD_SECS: f64 = 0.5;

/// Angle change counted as a direction reversal (radians).
const DIRECTION_CHANGE_THRESHOLD: f64 = std::f64::consts::PI / 4.0;

fn secs_between(a: chrono::DateTime<chrono::Utc>, b: chrono::DateTime<chrono::Utc>) -> f64 {
    (b - a).num_microseconds().unwrap_or(0) as f64 / 1e6
}

/// Extract keystroke-dynamics features from a window of key events.
pub fn extract_keystroke_features(
    events: &[KeyEvent],
    window_secs: f64,
) -> BTreeMap<&'static str, f64> {
    let presses: Vec<&KeyEvent> = events
        .iter()
        .filter(|e| e.kind == KeyEventKind::Press)
        .collect();
    if presses.is_empty() {
        return zero_keystroke_features();
    }

    let key_count = presses.len() as f64;

    // Words per minute, approximating 5 characters per word.
    let wpm = if window_secs > 0.0 {
        (key_count / 5.0) / (window_secs / 60.0)
    } else {
        0.0
    };

    // Dwell time: each press matched to the first release of the same key
    // at or after it.
    let mut releases_by_key: HashMap<&str, Vec<chrono::DateTime<chrono::Utc>>> = HashMap::new();
    for event in events.iter().filter(|e| e.kind == KeyEventKind::Release) {
        releases_by_key
            .entry(event.key.as_str())
            .or_default()
            .push(event.timestamp);
    }
    let mut dwell_times = Vec::new();
    for press in &presses {
        if let Some(times) = releases_by_key.get_mut(press.key.as_str()) {
            if let Some(pos) = times.iter().position(|&t| t >= press.timestamp) {
                dwell_times.push(secs_between(press.timestamp, times.remove(pos)));
            }
        }
    }

    // Flight time: interval between consecutive presses.
    let mut press_times: Vec<_> = presses.iter().map(|p| p.timestamp).collect();
    press_times.sort();
    let flights: Vec<f64> = press_times
        .windows(2)
        .map(|pair| secs_between(pair[0], pair[1]))
        .collect();

    let error_count = presses.iter().filter(|p| p.is_error_key).count() as f64;
    let error_rate = error_count / key_count;

    // Burst rate: keys per second within sub-second flights.
    let active_flights: Vec<f64> = flights.iter().filter(|&&f| f < 1.0).copied().collect();
    let burst_rate = if active_flights.is_empty() {
        0.0
    } else {
        1.0 / mean(&active_flights)
    };

    let pause_count = flights.iter().filter(|&&f| f > PAUSE_THRESHOLD_SECS).count() as f64;

    BTreeMap::from([
        ("wpm", wpm),
        ("key_count", key_count),
        ("dwell_mean", mean(&dwell_times)),
        ("dwell_std", std_dev(&dwell_times)),
        ("flight_mean", mean(&flights)),
        ("flight_std", std_dev(&flights)),
        ("error_rate", error_rate),
        ("burst_rate", burst_rate),
        ("pause_count", pause_count),
    ])
}

/// The canonical all-zero keystroke feature set.
pub fn zero_keystroke_features() -> BTreeMap<&'static str, f64> {
    KEYSTROKE_KEYS.iter().map(|&k| (k, 0.0)).collect()
}

/// Extract mouse-dynamics features from a window of mouse events.
pub fn extract_mouse_features(
    events: &[MouseEvent],
    window_secs: f64,
) -> BTreeMap<&'static str, f64> {
    let moves: Vec<&MouseEvent> = events
        .iter()
        .filter(|e| e.kind == MouseEventKind::Move)
        .collect();
    let clicks: Vec<&MouseEvent> = events
        .iter()
        .filter(|e| e.kind == MouseEventKind::Click && e.pressed)
        .collect();
    let scrolls: Vec<&MouseEvent> = events
        .iter()
        .filter(|e| e.kind == MouseEventKind::Scroll)
        .collect();

    if moves.is_empty() {
        return zero_mouse_features();
    }

    // Per-segment displacement, time delta, and velocity.
    let mut segment_dists = Vec::new();
    let mut segment_dts = Vec::new();
    let mut velocities = Vec::new();
    let mut headings = Vec::new();
    for pair in moves.windows(2) {
        let dx = pair[1].x - pair[0].x;
        let dy = pair[1].y - pair[0].y;
        let dist = (dx * dx + dy * dy).sqrt();
        let dt = secs_between(pair[0].timestamp, pair[1].timestamp).max(1e-6);
        segment_dists.push(dist);
        segment_dts.push(dt);
        velocities.push(dist / dt);
        headings.push(dy.atan2(dx));
    }

    let mouse_distance: f64 = segment_dists.iter().sum();

    // Acceleration: mean absolute velocity change per second.
    let accelerations: Vec<f64> = velocities
        .windows(2)
        .zip(segment_dts.iter().skip(1))
        .map(|(pair, &dt)| ((pair[1] - pair[0]) / dt).abs())
        .collect();

    let click_count = clicks.len() as f64;
    let click_rate = if window_secs > 0.0 {
        click_count / window_secs
    } else {
        0.0
    };
    let left_clicks = clicks
        .iter()
        .filter(|c| c.button == Some(MouseButton::Left))
        .count() as f64;
    let left_click_ratio = if click_count > 0.0 {
        left_clicks / click_count
    } else {
        0.0
    };

    let scroll_total: f64 = scrolls.iter().map(|s| s.scroll_dy.abs()).sum();

    let direction_changes = headings
        .windows(2)
        .filter(|pair| (pair[1] - pair[0]).abs() > DIRECTION_CHANGE_THRESHOLD)
        .count() as f64;

    let idle_time: f64 = segment_dts
        .iter()
        .filter(|&&dt| dt > IDLE_THRESHOLD_SECS)
        .sum();

    // Straightness: net displacement over path length. A stationary cursor
    // counts as perfectly straight.
    let first = moves[0];
    let last = moves[moves.len() - 1];
    let displacement = {
        let dx = last.x - first.x;
        let dy = last.y - first.y;
        (dx * dx + dy * dy).sqrt()
    };
    let movement_straightness = if mouse_distance > 0.0 {
        displacement / mouse_distance
    } else {
        1.0
    };

    BTreeMap::from([
        ("mouse_distance", mouse_distance),
        ("mouse_velocity_mean", mean(&velocities)),
        ("mouse_velocity_std", std_dev(&velocities)),
        ("mouse_acceleration_mean", mean(&accelerations)),
        ("click_count", click_count),
        ("click_rate", click_rate),
        ("left_click_ratio", left_click_ratio),
        ("scroll_total", scroll_total),
        ("direction_changes", direction_changes),
        ("idle_time", idle_time),
        ("movement_straightness", movement_straightness),
    ])
}

/// The canonical all-zero mouse feature set.
pub fn zero_mouse_features() -> BTreeMap<&'static str, f64> {
    MOUSE_KEYS.iter().map(|&k| (k, 0.0)).collect()
}

/// Extract the combined behavioral feature set (keystroke + mouse).
pub fn extract_behavioral_features(
    key_events: &[KeyEvent],
    mouse_events: &[MouseEvent],
    window_secs: f64,
) -> BTreeMap<&'static str, f64> {
    let mut features = extract_keystroke_features(key_events, window_secs);
    features.extend(extract_mouse_features(mouse_events, window_secs));
    features
}
