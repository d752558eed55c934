//! Bagged decision-forest classifier.

use crate::error::Result;
use crate::model::tree::{DecisionTree, TreeParams};
use crate::model::{accuracy, argmax, validate_training_data, BaseClassifier};
use crate::types::NUM_CLASSES;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Forest hyperparameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForestParams {
    pub num_trees: usize,
    pub tree: TreeParams,
    /// Training RNG seed (bootstrap sampling and feature subsampling).
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            num_trees: 50,
            tree: TreeParams::default(),
            seed: 42,
        }
    }
}

/// Bootstrap-aggregated CART trees with per-split feature subsampling.
///
/// Probabilities are the average of the trees' leaf distributions, so each
/// row sums to 1. Importance is the mean gini decrease across trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    params: ForestParams,
    trees: Vec<DecisionTree>,
    num_features: usize,
}

impl ForestModel {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            num_features: 0,
        }
    }

    pub fn is_trained(&self) -> bool {
        !self.trees.is_empty()
    }

    fn require_trained(&self) -> Result<()> {
        if self.is_trained() {
            Ok(())
        } else {
            Err(crate::error::CoreError::NotTrained)
        }
    }

    fn proba_one(&self, row: &[f64]) -> [f64; NUM_CLASSES] {
        let mut sums = [0.0; NUM_CLASSES];
        for tree in &self.trees {
            let probs = tree.predict_proba_one(row);
            for (s, p) in sums.iter_mut().zip(&probs) {
                *s += p;
            }
        }
        let n = self.trees.len() as f64;
        sums.map(|s| s / n)
    }
}

impl Default for ForestModel {
    fn default() -> Self {
        Self::new(ForestParams::default())
    }
}

impl BaseClassifier for ForestModel {
    fn train(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<()> {
        let cols = validate_training_data(x, y)?;
        self.num_features = cols;

        let n = x.len();
        let weights = vec![1.0; n];
        // sqrt-of-features subsampling per split.
        let feature_subsample = ((cols as f64).sqrt().round() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        self.trees = (0..self.params.num_trees)
            .map(|_| {
                let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(
                    x,
                    y,
                    &weights,
                    &indices,
                    self.params.tree,
                    Some(feature_subsample),
                    &mut rng,
                )
            })
            .collect();

        let report = accuracy(&self.predict(x)?, y);
        tracing::info!(
            samples = n,
            features = cols,
            trees = self.trees.len(),
            training_accuracy = report,
            "forest trained"
        );
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>> {
        self.require_trained()?;
        Ok(x.iter().map(|row| argmax(&self.proba_one(row))).collect())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<[f64; NUM_CLASSES]>> {
        self.require_trained()?;
        Ok(x.iter().map(|row| self.proba_one(row)).collect())
    }

    fn feature_importance(&self) -> Vec<f64> {
        if self.trees.is_empty() {
            return vec![0.0; self.num_features];
        }
        let mut totals = vec![0.0; self.num_features];
        for tree in &self.trees {
            for (t, &v) in totals.iter_mut().zip(tree.importance()) {
                *t += v;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            for t in &mut totals {
                *t /= sum;
            }
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_cluster_data() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..15 {
            let jitter = (i % 5) as f64 * 0.05;
            x.push(vec![0.0 + jitter, 0.2 - jitter]);
            y.push(0);
            x.push(vec![2.0 + jitter, 2.2 - jitter]);
            y.push(1);
            x.push(vec![4.0 + jitter, 4.2 - jitter]);
            y.push(2);
        }
        (x, y)
    }

    #[test]
    fn test_train_and_predict_clusters() {
        let (x, y) = three_cluster_data();
        let mut model = ForestModel::default();
        model.train(&x, &y).unwrap();
        let predictions = model.predict(&x).unwrap();
        assert!(accuracy(&predictions, &y) > 0.95);
    }

    #[test]
    fn test_proba_rows_sum_to_one() {
        let (x, y) = three_cluster_data();
        let mut model = ForestModel::default();
        model.train(&x, &y).unwrap();
        for row in model.predict_proba(&x).unwrap() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_training_is_seed_deterministic() {
        let (x, y) = three_cluster_data();
        let mut a = ForestModel::default();
        let mut b = ForestModel::default();
        a.train(&x, &y).unwrap();
        b.train(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_untrained_predict_fails() {
        let model = ForestModel::default();
        assert!(model.predict(&[vec![0.0, 0.0]]).is_err());
    }

    #[test]
    fn test_importance_normalized() {
        let (x, y) = three_cluster_data();
        let mut model = ForestModel::default();
        model.train(&x, &y).unwrap();
        let importance = model.feature_importance();
        assert_eq!(importance.len(), 2);
        assert!((importance.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
