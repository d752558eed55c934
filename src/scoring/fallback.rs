//! Rule-based degraded-mode scorer.
//!
//! Serves whenever no trained ensemble is loaded. This is a permanent
//! serving path, not placeholder code: the pipeline must keep producing
//! structured, explicitly low-confidence results with no trained artifact
//! on disk.

use crate::schema::FeatureVector;
use crate::types::{LoadLevel, ModalityScores, ScoringResult, NUM_CLASSES};
use chrono::Utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modality {
    Visual,
    Behavioral,
    Audio,
}

/// One threshold rule: exceeding `threshold` on `feature` adds `points`
/// to the stress score.
struct Rule {
    feature: &'static str,
    threshold: f64,
    points: f64,
    modality: Modality,
}

/// Stress indicators over the fused feature keys. Thresholds are
/// deliberately conservative; the fallback only needs coarse banding.
const RULES: [Rule; 7] = [
    Rule {
        feature: "vis_blink_rate",
        threshold: 25.0, // blinks per minute
        points: 2.0,
        modality: Modality::Visual,
    },
    Rule {
        feature: "vis_head_movement",
        threshold: 3.0,
        points: 1.0,
        modality: Modality::Visual,
    },
    Rule {
        feature: "beh_error_rate",
        threshold: 0.15,
        points: 2.0,
        modality: Modality::Behavioral,
    },
    Rule {
        feature: "beh_pause_count",
        threshold: 3.0,
        points: 1.0,
        modality: Modality::Behavioral,
    },
    Rule {
        feature: "beh_mouse_velocity_std",
        threshold: 400.0,
        points: 1.0,
        modality: Modality::Behavioral,
    },
    Rule {
        feature: "aud_pitch_variance",
        threshold: 800.0,
        points: 2.0,
        modality: Modality::Audio,
    },
    Rule {
        feature: "aud_jitter",
        threshold: 0.05,
        points: 1.0,
        modality: Modality::Audio,
    },
];

/// Score bands and their fixed, intentionally low confidences.
const MEDIUM_BAND: f64 = 2.0;
const HIGH_BAND: f64 = 4.0;
const LOW_CONFIDENCE: f64 = 0.35;
const MEDIUM_CONFIDENCE: f64 = 0.40;
const HIGH_CONFIDENCE: f64 = 0.45;

/// Threshold-rule scorer used when no trained ensemble is available.
#[derive(Debug, Default)]
pub struct FallbackScorer;

impl FallbackScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score the fused vector against the rule table.
    pub fn score(&self, vector: &FeatureVector) -> ScoringResult {
        let mut total = 0.0;
        let mut visual = 0.0;
        let mut behavioral = 0.0;
        let mut audio = 0.0;

        for rule in &RULES {
            let value = vector.get(rule.feature).unwrap_or(0.0);
            if value > rule.threshold {
                tracing::debug!(feature = rule.feature, value, "fallback rule tripped");
                total += rule.points;
                match rule.modality {
                    Modality::Visual => visual += rule.points,
                    Modality::Behavioral => behavioral += rule.points,
                    Modality::Audio => audio += rule.points,
                }
            }
        }

        let (load_level, confidence) = if total >= HIGH_BAND {
            (LoadLevel::High, HIGH_CONFIDENCE)
        } else if total >= MEDIUM_BAND {
            (LoadLevel::Medium, MEDIUM_CONFIDENCE)
        } else {
            (LoadLevel::Low, LOW_CONFIDENCE)
        };

        let modality_scores = if total > 0.0 {
            ModalityScores {
                visual: visual / total,
                behavioral: behavioral / total,
                audio: audio / total,
            }
        } else {
            ModalityScores::FALLBACK
        };

        // Remaining mass is split evenly across the losing classes so the
        // triple still sums to 1.
        let mut probabilities = [(1.0 - confidence) / (NUM_CLASSES - 1) as f64; NUM_CLASSES];
        probabilities[load_level.index()] = confidence;

        ScoringResult {
            load_level,
            confidence,
            probabilities,
            modality_scores,
            per_model: None,
            timestamp: Utc::now(),
            degraded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn vector_with(entries: &[(&str, f64)]) -> FeatureVector {
        let values: BTreeMap<String, f64> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        FeatureVector::from_values(values).unwrap()
    }

    #[test]
    fn test_quiet_vector_scores_low() {
        let result = FallbackScorer::new().score(&vector_with(&[]));
        assert_eq!(result.load_level, LoadLevel::Low);
        assert_eq!(result.confidence, LOW_CONFIDENCE);
        assert!(result.degraded);
        assert!(result.per_model.is_none());
        assert_eq!(result.modality_scores, ModalityScores::FALLBACK);
        assert!((result.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_elevated_blink_and_errors_score_high() {
        let vector = vector_with(&[
            ("vis_blink_rate", 32.0),
            ("beh_error_rate", 0.3),
            ("aud_pitch_variance", 1200.0),
        ]);
        let result = FallbackScorer::new().score(&vector);
        assert_eq!(result.load_level, LoadLevel::High);
        assert_eq!(result.confidence, HIGH_CONFIDENCE);
        assert!((result.modality_scores.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_medium_band() {
        let vector = vector_with(&[("beh_error_rate", 0.2)]);
        let result = FallbackScorer::new().score(&vector);
        assert_eq!(result.load_level, LoadLevel::Medium);
        assert_eq!(result.confidence, MEDIUM_CONFIDENCE);
        assert_eq!(result.modality_scores.behavioral, 1.0);
    }

    #[test]
    fn test_value_at_threshold_does_not_trip() {
        let vector = vector_with(&[("beh_pause_count", 3.0)]);
        let result = FallbackScorer::new().score(&vector);
        assert_eq!(result.load_level, LoadLevel::Low);
    }
}
