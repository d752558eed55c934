//! Boosted shallow-tree classifier (SAMME multi-class boosting).

use crate::error::Result;
use crate::model::tree::{DecisionTree, TreeParams};
use crate::model::{accuracy, argmax, validate_training_data, BaseClassifier};
use crate::types::NUM_CLASSES;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Boosting hyperparameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoostParams {
    pub num_rounds: usize,
    pub tree: TreeParams,
    pub seed: u64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            num_rounds: 30,
            tree: TreeParams {
                max_depth: 3,
                min_samples_split: 4,
            },
            seed: 42,
        }
    }
}

/// One boosting stage: a shallow tree and its vote weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stage {
    tree: DecisionTree,
    alpha: f64,
}

/// Sequentially boosted shallow trees.
///
/// Each round refits on reweighted samples, upweighting the previous
/// round's mistakes. Probabilities are normalized stage-weighted votes;
/// importance is the stage-weight-weighted average of tree importances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostModel {
    params: BoostParams,
    stages: Vec<Stage>,
    num_features: usize,
}

impl BoostModel {
    pub fn new(params: BoostParams) -> Self {
        Self {
            params,
            stages: Vec::new(),
            num_features: 0,
        }
    }

    pub fn is_trained(&self) -> bool {
        !self.stages.is_empty()
    }

    fn require_trained(&self) -> Result<()> {
        if self.is_trained() {
            Ok(())
        } else {
            Err(crate::error::CoreError::NotTrained)
        }
    }

    fn proba_one(&self, row: &[f64]) -> [f64; NUM_CLASSES] {
        let mut votes = [0.0; NUM_CLASSES];
        for stage in &self.stages {
            votes[stage.tree.predict_one(row)] += stage.alpha;
        }
        let total: f64 = votes.iter().sum();
        if total > 0.0 {
            votes.map(|v| v / total)
        } else {
            [1.0 / NUM_CLASSES as f64; NUM_CLASSES]
        }
    }
}

impl Default for BoostModel {
    fn default() -> Self {
        Self::new(BoostParams::default())
    }
}

impl BaseClassifier for BoostModel {
    fn train(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<()> {
        let cols = validate_training_data(x, y)?;
        self.num_features = cols;
        self.stages.clear();

        let n = x.len();
        let indices: Vec<usize> = (0..n).collect();
        let mut weights = vec![1.0 / n as f64; n];
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        // SAMME admissibility bound for K classes.
        let error_ceiling = 1.0 - 1.0 / NUM_CLASSES as f64;

        for round in 0..self.params.num_rounds {
            let tree = DecisionTree::fit(
                x,
                y,
                &weights,
                &indices,
                self.params.tree,
                None,
                &mut rng,
            );

            let predictions: Vec<usize> = x.iter().map(|row| tree.predict_one(row)).collect();
            let total_weight: f64 = weights.iter().sum();
            let error: f64 = weights
                .iter()
                .zip(predictions.iter().zip(y))
                .filter(|(_, (p, l))| p != l)
                .map(|(w, _)| w)
                .sum::<f64>()
                / total_weight;

            if error >= error_ceiling {
                tracing::debug!(round, error, "boosting stopped: weak learner no better than chance");
                break;
            }

            let clamped = error.clamp(1e-10, 1.0 - 1e-10);
            let alpha = ((1.0 - clamped) / clamped).ln() + ((NUM_CLASSES - 1) as f64).ln();
            self.stages.push(Stage { tree, alpha });

            if error < 1e-10 {
                // Perfect fit; further rounds would only repeat it.
                break;
            }

            for (w, (p, l)) in weights.iter_mut().zip(predictions.iter().zip(y)) {
                if p != l {
                    *w *= alpha.exp();
                }
            }
            let sum: f64 = weights.iter().sum();
            for w in &mut weights {
                *w /= sum;
            }
        }

        if self.stages.is_empty() {
            return Err(crate::error::CoreError::InvalidTrainingData(
                "boosting produced no admissible stage".into(),
            ));
        }

        let report = accuracy(&self.predict(x)?, y);
        tracing::info!(
            samples = n,
            features = cols,
            stages = self.stages.len(),
            training_accuracy = report,
            "boost model trained"
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
        if self.stages.is_empty() {
            return vec![0.0; self.num_features];
        }
        let mut totals = vec![0.0; self.num_features];
        for stage in &self.stages {
            for (t, &v) in totals.iter_mut().zip(stage.tree.importance()) {
                *t += stage.alpha * v;
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
