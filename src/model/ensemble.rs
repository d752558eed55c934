//! Ensemble classifier combining the forest, boost, and kernel models.

use crate::error::{CoreError, Result};
use crate::fusion::scaler::StandardScaler;
use crate::model::{accuracy, argmax, validate_training_data, BaseClassifier};
use crate::model::{BoostModel, ForestModel, KernelModel};
use crate::types::{LoadLevel, PerModelLabels, NUM_CLASSES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Static combination weights for the three base models.
///
/// Weighting is configured, never learned from training accuracy; a
/// deliberate simplicity choice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    pub forest: f64,
    pub boost: f64,
    pub kernel: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            forest: 1.0,
            boost: 1.0,
            kernel: 1.0,
        }
    }
}

impl EnsembleWeights {
    pub fn sum(&self) -> f64 {
        self.forest + self.boost + self.kernel
    }

    /// Weights must be non-negative with a positive sum.
    pub fn validate(&self) -> Result<()> {
        if self.forest < 0.0 || self.boost < 0.0 || self.kernel < 0.0 || self.sum() <= 0.0 {
            return Err(CoreError::DegenerateWeights);
        }
        Ok(())
    }
}

/// Per-model training accuracy, for diagnostics only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrainingReport {
    pub forest_accuracy: f64,
    pub boost_accuracy: f64,
    pub kernel_accuracy: f64,
}

/// Single-sample prediction with full explainability detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionDetails {
    pub load_level: LoadLevel,
    pub confidence: f64,
    pub probabilities: [f64; NUM_CLASSES],
    pub per_model: PerModelLabels,
}

/// Weighted-average combination of three probability rows.
pub(crate) fn combine_rows(
    rows: [[f64; NUM_CLASSES]; 3],
    weights: &EnsembleWeights,
) -> [f64; NUM_CLASSES] {
    let total = weights.sum();
    let mut combined = [0.0; NUM_CLASSES];
    for c in 0..NUM_CLASSES {
        combined[c] = (weights.forest * rows[0][c]
            + weights.boost * rows[1][c]
            + weights.kernel * rows[2][c])
            / total;
    }
    combined
}

/// Soft-voting ensemble over the three base classifiers.
///
/// Constructed untrained; only trained instances may be persisted or
/// loaded into a serving context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleModel {
    weights: EnsembleWeights,
    forest: ForestModel,
    boost: BoostModel,
    kernel: KernelModel,
    feature_names: Vec<String>,
}

/// The atomic persistence unit: classifiers, feature-name ordering, and
/// combination weights travel together (plus the fitted scaler when one
/// exists). A bundle without a feature ordering is unusable.
#[derive(Debug, Serialize, Deserialize)]
struct ModelBundle {
    model: EnsembleModel,
    #[serde(default)]
    scaler: Option<StandardScaler>,
}

impl EnsembleModel {
    pub fn new(weights: EnsembleWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self {
            weights,
            forest: ForestModel::default(),
            boost: BoostModel::default(),
            kernel: KernelModel::default(),
            feature_names: Vec::new(),
        })
    }

    pub fn is_trained(&self) -> bool {
        self.forest.is_trained() && self.boost.is_trained() && self.kernel.is_trained()
    }

    pub fn weights(&self) -> &EnsembleWeights {
        &self.weights
    }

    /// Feature-name ordering this model was trained against.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn require_trained(&self) -> Result<()> {
        if self.is_trained() {
            Ok(())
        } else {
            Err(CoreError::NotTrained)
        }
    }

    fn check_width(&self, row: &[f64]) -> Result<()> {
        if row.len() != self.feature_names.len() {
            return Err(CoreError::SchemaMismatch(format!(
                "model expects {} features, got {}",
                self.feature_names.len(),
                row.len()
            )));
        }
        Ok(())
    }

    /// Train all three base models independently.
    ///
    /// The returned per-model accuracies are diagnostics only; they are
    /// never fed back into the combination weights.
    pub fn train(
        &mut self,
        x: &[Vec<f64>],
        y: &[usize],
        feature_names: Vec<String>,
    ) -> Result<TrainingReport> {
        let cols = validate_training_data(x, y)?;
        if feature_names.len() != cols {
            return Err(CoreError::SchemaMismatch(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                cols
            )));
        }
        self.feature_names = feature_names;

        self.forest.train(x, y)?;
        self.boost.train(x, y)?;
        self.kernel.train(x, y)?;

        let report = TrainingReport {
            forest_accuracy: accuracy(&self.forest.predict(x)?, y),
            boost_accuracy: accuracy(&self.boost.predict(x)?, y),
            kernel_accuracy: accuracy(&self.kernel.predict(x)?, y),
        };
        tracing::info!(
            forest = report.forest_accuracy,
            boost = report.boost_accuracy,
            kernel = report.kernel_accuracy,
            "ensemble trained"
        );
        Ok(report)
    }

    /// Weighted-average class probabilities, one row per sample.
    pub fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<[f64; NUM_CLASSES]>> {
        self.require_trained()?;
        self.weights.validate()?;
        for row in x {
            self.check_width(row)?;
        }

        let forest = self.forest.predict_proba(x)?;
        let boost = self.boost.predict_proba(x)?;
        let kernel = self.kernel.predict_proba(x)?;

        Ok((0..x.len())
            .map(|i| combine_rows([forest[i], boost[i], kernel[i]], &self.weights))
            .collect())
    }

    /// Argmax labels over the ensemble probabilities; ties break toward
    /// the lowest class index.
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>> {
        Ok(self
            .predict_proba(x)?
            .iter()
            .map(argmax)
            .collect())
    }

    /// Single-sample prediction with per-model labels for explainability.
    pub fn predict_with_details(&self, row: &[f64]) -> Result<PredictionDetails> {
        self.require_trained()?;
        self.check_width(row)?;

        let sample = row.to_vec();
        let batch = std::slice::from_ref(&sample);
        let probabilities = self.predict_proba(batch)?[0];
        let winner = argmax(&probabilities);

        let per_model = PerModelLabels {
            forest: LoadLevel::from_index(self.forest.predict(batch)?[0]),
            boost: LoadLevel::from_index(self.boost.predict(batch)?[0]),
            kernel: LoadLevel::from_index(self.kernel.predict(batch)?[0]),
        };

        Ok(PredictionDetails {
            load_level: LoadLevel::from_index(winner),
            confidence: probabilities[winner],
            probabilities,
            per_model,
        })
    }

    /// Per-feature importance averaged over the two tree-based models.
    ///
    /// The kernel model has no natural linear importance and contributes
    /// zero to the average, an intentional asymmetry kept as documented
    /// behavior.
    pub fn feature_importance(&self) -> BTreeMap<String, f64> {
        let forest = self.forest.feature_importance();
        let boost = self.boost.feature_importance();
        self.feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let f = forest.get(i).copied().unwrap_or(0.0);
                let b = boost.get(i).copied().unwrap_or(0.0);
                (name.clone(), (f + b) / 2.0)
            })
            .collect()
    }

    /// Persist the trained ensemble (and optional scaler) as one bundle.
    ///
    /// The write goes through a sibling temp file and a rename so readers
    /// never observe a half-written bundle.
    pub fn save(&self, path: &Path, scaler: Option<&StandardScaler>) -> Result<()> {
        self.require_trained()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bundle = ModelBundle {
            model: self.clone(),
            scaler: scaler.cloned(),
        };
        let json = serde_json::to_string(&bundle)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        tracing::info!(path = %path.display(), "ensemble bundle saved");
        Ok(())
    }

    /// Load a bundle, refusing anything partial or schema-less.
    pub fn load(path: &Path) -> Result<(Self, Option<StandardScaler>)> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CoreError::ModelUnavailable(format!("{}: {e}", path.display())))?;
        let bundle: ModelBundle = serde_json::from_str(&json)?;

        if bundle.model.feature_names.is_empty() {
            return Err(CoreError::SchemaMismatch(
                "bundle carries classifiers but no feature-name ordering".into(),
            ));
        }
        if !bundle.model.is_trained() {
            return Err(CoreError::ModelUnavailable(
                "bundle contains untrained classifiers".into(),
            ));
        }
        bundle.model.weights.validate()?;

        tracing::info!(path = %path.display(), "ensemble bundle loaded");
        Ok((bundle.model, bundle.scaler))
    }
}
