//! Audio feature extraction from buffered microphone chunks.
//!
//! Time-domain voice stress features: energy, a zero-crossing pitch proxy,
//! pitch variance, and a jitter proxy. Spectral analysis (MFCC etc.) is the
//! job of the upstream voice collaborator and is not reproduced here.

use crate::capture::events::AudioChunk;
use crate::features::{mean, std_dev};
use std::collections::BTreeMap;

/// Canonical audio feature keys.
pub const KEYS: [&str; 8] = [
    "energy_mean",
    "energy_std",
    "rms",
    "pitch_mean",
    "pitch_variance",
    "jitter",
    "silence_ratio",
    "voiced_ratio",
];

/// RMS level below which a chunk counts as silence.
const SILENCE_RMS_THRESHOLD: f64 = 0.01;

/// Sub-frame length for the voiced ratio (seconds).
const SUBFRAME_SECS: f64 = 0.02;

/// Plausible voice pitch band for the zero-crossing proxy (Hz).
const PITCH_MIN_HZ: f64 = 50.0;
const PITCH_MAX_HZ: f64 = 500.0;

/// Extract audio stress features from a window of chunks.
///
/// Returns the canonical zero set when the window is empty or entirely
/// silent; the schema never shrinks.
pub fn extract_audio_features(chunks: &[AudioChunk]) -> BTreeMap<&'static str, f64> {
    if chunks.is_empty() {
        return zero_features();
    }

    let energies: Vec<f64> = chunks.iter().map(|c| rms(&c.samples)).collect();
    let silent_chunks = energies
        .iter()
        .filter(|&&e| e < SILENCE_RMS_THRESHOLD)
        .count();
    let silence_ratio = silent_chunks as f64 / chunks.len() as f64;

    if silent_chunks == chunks.len() {
        tracing::debug!("audio window entirely silent");
        return zero_features();
    }

    // Pitch proxy per voiced chunk: zero-crossing rate mapped to Hz.
    let pitches: Vec<f64> = chunks
        .iter()
        .zip(&energies)
        .filter(|(_, &e)| e >= SILENCE_RMS_THRESHOLD)
        .filter_map(|(c, _)| pitch_estimate(&c.samples, c.sample_rate))
        .collect();

    let pitch_mean = mean(&pitches);
    let pitch_std = std_dev(&pitches);
    let pitch_variance = pitch_std * pitch_std;

    // Jitter proxy: mean relative pitch change between consecutive voiced
    // chunks.
    let jitter = if pitches.len() > 1 && pitch_mean > 0.0 {
        let deltas: Vec<f64> = pitches.windows(2).map(|p| (p[1] - p[0]).abs()).collect();
        mean(&deltas) / pitch_mean
    } else {
        0.0
    };

    // Voiced ratio over 20 ms sub-frames of the concatenated window.
    let voiced_ratio = {
        let mut voiced = 0usize;
        let mut total = 0usize;
        for chunk in chunks {
            let hop = ((chunk.sample_rate as f64 * SUBFRAME_SECS) as usize).max(1);
            for frame in chunk.samples.chunks(hop) {
                total += 1;
                if rms(frame) >= SILENCE_RMS_THRESHOLD {
                    voiced += 1;
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            voiced as f64 / total as f64
        }
    };

    let all_samples_rms = {
        let total_sq: f64 = chunks
            .iter()
            .flat_map(|c| c.samples.iter())
            .map(|&s| (s as f64) * (s as f64))
            .sum();
        let count: usize = chunks.iter().map(|c| c.samples.len()).sum();
        if count == 0 {
            0.0
        } else {
            (total_sq / count as f64).sqrt()
        }
    };

    let features = BTreeMap::from([
        ("energy_mean", mean(&energies)),
        ("energy_std", std_dev(&energies)),
        ("rms", all_samples_rms),
        ("pitch_mean", pitch_mean),
        ("pitch_variance", pitch_variance),
        ("jitter", jitter),
        ("silence_ratio", silence_ratio),
        ("voiced_ratio", voiced_ratio),
    ]);
    tracing::debug!(count = features.len(), "extracted audio features");
    features
}

/// The canonical all-zero audio feature set.
pub fn zero_features() -> BTreeMap<&'static str, f64> {
    KEYS.iter().map(|&k| (k, 0.0)).collect()
}

fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Fundamental frequency estimate from the zero-crossing rate.
///
/// A periodic signal crosses zero twice per cycle, so f0 ≈ crossings *
/// rate / (2 * len). Estimates outside the plausible voice band are
/// discarded.
fn pitch_estimate(samples: &[f32], sample_rate: u32) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }
    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    let pitch = crossings as f64 * sample_rate as f64 / (2.0 * samples.len() as f64);
    if (PITCH_MIN_HZ..=PITCH_MAX_HZ).contains(&pitch) {
        Some(pitch)
    } else {
        None
    }
}
