//! Per-modality contribution breakdown from feature importances.

use crate::schema::{FeatureVector, AUDIO_PREFIX, BEHAVIORAL_PREFIX, VISUAL_PREFIX};
use crate::types::ModalityScores;
use std::collections::BTreeMap;

/// Derive the visual/behavioral/audio contribution triple.
///
/// Each feature contributes |importance × value| to its modality's bucket;
/// buckets are normalized by their sum. A zero total returns the fixed
/// fallback triple instead of dividing by zero.
pub fn modality_attribution(
    importance: &BTreeMap<String, f64>,
    vector: &FeatureVector,
) -> ModalityScores {
    let mut visual = 0.0;
    let mut behavioral = 0.0;
    let mut audio = 0.0;

    for (name, value) in vector.iter() {
        let weight = (importance.get(name).copied().unwrap_or(0.0) * value).abs();
        if name.starts_with(VISUAL_PREFIX) {
            visual += weight;
        } else if name.starts_with(BEHAVIORAL_PREFIX) {
            behavioral += weight;
        } else if name.starts_with(AUDIO_PREFIX) {
            audio += weight;
        }
    }

    let total = visual + behavioral + audio;
    if total == 0.0 {
        return ModalityScores::FALLBACK;
    }
    ModalityScores {
        visual: visual / total,
        behavioral: behavioral / total,
        audio: audio / total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn vector_with(entries: &[(&str, f64)]) -> FeatureVector {
        let values: BTreeMap<String, f64> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        FeatureVector::from_values(values).unwrap()
    }

    #[test]
    fn test_zero_buckets_return_fallback_triple() {
        let vector = vector_with(&[]);
        let importance = BTreeMap::new();
        let scores = modality_attribution(&importance, &vector);
        assert_eq!(scores, ModalityScores::FALLBACK);
    }

    #[test]
    fn test_single_modality_takes_full_share() {
        let vector = vector_with(&[("vis_blink_rate", 20.0)]);
        let mut importance = BTreeMap::new();
        importance.insert("vis_blink_rate".to_string(), 0.5);
        let scores = modality_attribution(&importance, &vector);
        assert_eq!(scores.visual, 1.0);
        assert_eq!(scores.behavioral, 0.0);
        assert_eq!(scores.audio, 0.0);
    }

    #[test]
    fn test_contributions_normalize_across_modalities() {
        let vector = vector_with(&[("vis_ear_mean", 2.0), ("beh_wpm", 6.0)]);
        let mut importance = BTreeMap::new();
        importance.insert("vis_ear_mean".to_string(), 0.5); // weight 1.0
        importance.insert("beh_wpm".to_string(), 0.5); // weight 3.0
        let scores = modality_attribution(&importance, &vector);
        assert!((scores.visual - 0.25).abs() < 1e-9);
        assert!((scores.behavioral - 0.75).abs() < 1e-9);
        assert!((scores.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_values_count_by_magnitude() {
        let vector = vector_with(&[("vis_head_pitch_mean", -4.0)]);
        let mut importance = BTreeMap::new();
        importance.insert("vis_head_pitch_mean".to_string(), 0.25);
        let scores = modality_attribution(&importance, &vector);
        assert_eq!(scores.visual, 1.0);
    }

    #[test]
    fn test_every_schema_key_belongs_to_a_bucket() {
        for name in schema::feature_names() {
            assert!(
                name.starts_with(VISUAL_PREFIX)
                    || name.starts_with(BEHAVIORAL_PREFIX)
                    || name.starts_with(AUDIO_PREFIX)
            );
        }
    }
}
