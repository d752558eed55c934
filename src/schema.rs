//! The fused feature schema, defined once and shared by the training and
//! inference paths.
//!
//! Feature keys are namespaced by modality prefix and the array form is
//! ordered by ascending key. That ordering is a hard contract with any
//! trained model: both the training matrix and the live vector index into
//! the same list, so the two paths cannot silently diverge.

use crate::error::{CoreError, Result};
use crate::features::{audio, behavioral, visual};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Modality prefixes applied during fusion.
pub const VISUAL_PREFIX: &str = "vis_";
pub const BEHAVIORAL_PREFIX: &str = "beh_";
pub const AUDIO_PREFIX: &str = "aud_";

/// Total number of fused features.
pub const FEATURE_COUNT: usize =
    visual::KEYS.len() + behavioral::KEYSTROKE_KEYS.len() + behavioral::MOUSE_KEYS.len() + audio::KEYS.len();

static SCHEMA: OnceLock<Vec<String>> = OnceLock::new();

/// The full ordered list of fused feature names, ascending by key.
pub fn feature_names() -> &'static [String] {
    SCHEMA.get_or_init(|| {
        let mut names: Vec<String> = Vec::with_capacity(FEATURE_COUNT);
        names.extend(visual::KEYS.iter().map(|k| format!("{VISUAL_PREFIX}{k}")));
        names.extend(
            behavioral::KEYSTROKE_KEYS
                .iter()
                .chain(behavioral::MOUSE_KEYS.iter())
                .map(|k| format!("{BEHAVIORAL_PREFIX}{k}")),
        );
        names.extend(audio::KEYS.iter().map(|k| format!("{AUDIO_PREFIX}{k}")));
        names.sort();
        names
    })
}

/// Index of a feature name in the schema, if present.
pub fn index_of(name: &str) -> Option<usize> {
    feature_names().binary_search_by(|n| n.as_str().cmp(name)).ok()
}

/// One fused, fixed-schema feature mapping.
///
/// The key set and count are invariant regardless of data availability;
/// modalities with nothing to report contribute their canonical zero sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    /// Merge per-modality feature sets under their fixed prefixes.
    pub fn fuse(
        visual: BTreeMap<&'static str, f64>,
        behavioral: BTreeMap<&'static str, f64>,
        audio: BTreeMap<&'static str, f64>,
    ) -> Self {
        let mut fused = BTreeMap::new();
        for (k, v) in visual {
            fused.insert(format!("{VISUAL_PREFIX}{k}"), v);
        }
        for (k, v) in behavioral {
            fused.insert(format!("{BEHAVIORAL_PREFIX}{k}"), v);
        }
        for (k, v) in audio {
            fused.insert(format!("{AUDIO_PREFIX}{k}"), v);
        }
        tracing::debug!(count = fused.len(), "fused feature vector");
        Self(fused)
    }

    /// Build from already-prefixed values, zero-filling any schema key the
    /// input does not carry. Keys outside the schema are rejected.
    pub fn from_values(values: BTreeMap<String, f64>) -> Result<Self> {
        for key in values.keys() {
            if index_of(key).is_none() {
                return Err(CoreError::SchemaMismatch(format!(
                    "unknown feature key '{key}'"
                )));
            }
        }
        let mut full = BTreeMap::new();
        for name in feature_names() {
            full.insert(name.clone(), values.get(name).copied().unwrap_or(0.0));
        }
        Ok(Self(full))
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Values in schema (ascending key) order.
    ///
    /// Fails with `SchemaMismatch` if the key set diverges from the shared
    /// schema; a misaligned array would silently corrupt predictions.
    pub fn to_array(&self) -> Result<Vec<f64>> {
        if self.0.len() != FEATURE_COUNT {
            return Err(CoreError::SchemaMismatch(format!(
                "expected {FEATURE_COUNT} features, found {}",
                self.0.len()
            )));
        }
        let mut array = Vec::with_capacity(FEATURE_COUNT);
        for name in feature_names() {
            match self.0.get(name) {
                Some(&v) => array.push(v),
                None => {
                    return Err(CoreError::SchemaMismatch(format!(
                        "missing feature '{name}'"
                    )))
                }
            }
        }
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_schema_is_sorted_and_complete() {
        let names = feature_names();
        assert_eq!(names.len(), FEATURE_COUNT);
        let mut sorted = names.to_vec();
        sorted.sort();
        assert_eq!(names, &sorted[..]);
    }

    #[test]
    fn test_every_name_is_prefixed() {
        for name in feature_names() {
            assert!(
                name.starts_with(VISUAL_PREFIX)
                    || name.starts_with(BEHAVIORAL_PREFIX)
                    || name.starts_with(AUDIO_PREFIX),
                "unprefixed feature name: {name}"
            );
        }
    }

    #[test]
    fn test_index_of_round_trip() {
        for (i, name) in feature_names().iter().enumerate() {
            assert_eq!(index_of(name), Some(i));
        }
        assert_eq!(index_of("vis_not_a_feature"), None);
    }

    #[test]
    fn test_fuse_and_to_array_are_consistent() {
        let fused = FeatureVector::fuse(
            crate::features::visual::zero_features(),
            crate::features::behavioral::extract_behavioral_features(&[], &[], 5.0),
            crate::features::audio::zero_features(),
        );
        assert_eq!(fused.len(), FEATURE_COUNT);
        let array = fused.to_array().unwrap();
        assert_eq!(array.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_from_values_rejects_unknown_keys() {
        let mut values = BTreeMap::new();
        values.insert("vis_blink_count".to_string(), 3.0);
        values.insert("bogus_key".to_string(), 1.0);
        assert!(FeatureVector::from_values(values).is_err());
    }

    #[test]
    fn test_from_values_zero_fills() {
        let mut values = BTreeMap::new();
        values.insert("vis_blink_count".to_string(), 3.0);
        let vector = FeatureVector::from_values(values).unwrap();
        assert_eq!(vector.len(), FEATURE_COUNT);
        assert_eq!(vector.get("vis_blink_count"), Some(3.0));
        assert_eq!(vector.get("aud_jitter"), Some(0.0));
    }
}
