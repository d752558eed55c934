//! Base classifiers and the ensemble scorer.
//!
//! The three base models are interchangeable behind the `BaseClassifier`
//! contract: train, predict, predict_proba, feature_importance. The
//! ensemble combines their probability rows with static configured weights.

pub mod boost;
pub mod ensemble;
pub mod forest;
pub mod kernel;
pub mod tree;

pub use boost::BoostModel;
pub use ensemble::{EnsembleModel, EnsembleWeights, TrainingReport};
pub use forest::ForestModel;
pub use kernel::KernelModel;

use crate::error::{CoreError, Result};
use crate::types::NUM_CLASSES;

/// The four-operation contract every base classifier implements.
///
/// `predict_proba` rows are per-class probabilities summing to 1;
/// `feature_importance` returns one value per feature, summing to 1 when
/// the model has a natural importance notion and all zeros when it does
/// not (the kernel model).
pub trait BaseClassifier {
    fn train(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<()>;
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>>;
    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<[f64; NUM_CLASSES]>>;
    fn feature_importance(&self) -> Vec<f64>;
}

/// Argmax with deterministic tie-breaking toward the lowest class index.
pub(crate) fn argmax(probs: &[f64; NUM_CLASSES]) -> usize {
    let mut best = 0;
    for (i, &p) in probs.iter().enumerate().skip(1) {
        if p > probs[best] {
            best = i;
        }
    }
    best
}

/// Validate a training set shape: non-empty, rectangular, labels in range.
pub(crate) fn validate_training_data(x: &[Vec<f64>], y: &[usize]) -> Result<usize> {
    if x.is_empty() {
        return Err(CoreError::InvalidTrainingData("empty feature matrix".into()));
    }
    if x.len() != y.len() {
        return Err(CoreError::InvalidTrainingData(format!(
            "{} samples but {} labels",
            x.len(),
            y.len()
        )));
    }
    let cols = x[0].len();
    if cols == 0 || x.iter().any(|row| row.len() != cols) {
        return Err(CoreError::InvalidTrainingData("ragged feature matrix".into()));
    }
    if y.iter().any(|&label| label >= NUM_CLASSES) {
        return Err(CoreError::InvalidTrainingData(format!(
            "label out of range (expected 0..{NUM_CLASSES})"
        )));
    }
    Ok(cols)
}

/// Fraction of predictions matching the labels.
pub(crate) fn accuracy(predictions: &[usize], y: &[usize]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let hits = predictions.iter().zip(y).filter(|(p, l)| p == l).count();
    hits as f64 / y.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_tie_breaks_low() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[0.1, 0.45, 0.45]), 1);
        assert_eq!(argmax(&[0.2, 0.3, 0.5]), 2);
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert!(validate_training_data(&[], &[]).is_err());
        assert!(validate_training_data(&[vec![1.0]], &[0, 1]).is_err());
        assert!(validate_training_data(&[vec![1.0], vec![1.0, 2.0]], &[0, 1]).is_err());
        assert!(validate_training_data(&[vec![1.0]], &[3]).is_err());
        assert_eq!(validate_training_data(&[vec![1.0, 2.0]], &[2]).unwrap(), 2);
    }
}
