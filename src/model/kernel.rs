//! RBF kernel-margin classifier (one-vs-rest kernel ridge scoring).

use crate::error::{CoreError, Result};
use crate::model::{accuracy, argmax, validate_training_data, BaseClassifier};
use crate::types::NUM_CLASSES;
use serde::{Deserialize, Serialize};

/// Kernel model hyperparameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KernelParams {
    /// Ridge regularization strength.
    pub lambda: f64,
    /// RBF width; `None` scales from the data (1 / (d * mean variance)).
    pub gamma: Option<f64>,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            lambda: 1e-2,
            gamma: None,
        }
    }
}

/// One-vs-rest RBF kernel machine with ridge-regularized margins.
///
/// Training solves (K + λI) α_c = t_c exactly per class; inference scores
/// against the stored training rows and maps margins through a softmax.
/// There is no natural per-feature linear importance for a non-linear
/// kernel, so `feature_importance` is all zeros.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelModel {
    params: KernelParams,
    support: Vec<Vec<f64>>,
    /// Dual coefficients, one vector per class.
    alphas: Vec<Vec<f64>>,
    gamma: f64,
    num_features: usize,
}

impl KernelModel {
    pub fn new(params: KernelParams) -> Self {
        Self {
            params,
            support: Vec::new(),
            alphas: Vec::new(),
            gamma: 0.0,
            num_features: 0,
        }
    }

    pub fn is_trained(&self) -> bool {
        !self.support.is_empty()
    }

    fn require_trained(&self) -> Result<()> {
        if self.is_trained() {
            Ok(())
        } else {
            Err(CoreError::NotTrained)
        }
    }

    fn rbf(&self, a: &[f64], b: &[f64]) -> f64 {
        let dist_sq: f64 = a.iter().zip(b).map(|(&u, &v)| (u - v) * (u - v)).sum();
        (-self.gamma * dist_sq).exp()
    }

    fn margins(&self, row: &[f64]) -> [f64; NUM_CLASSES] {
        let kernel_row: Vec<f64> = self.support.iter().map(|s| self.rbf(s, row)).collect();
        let mut margins = [0.0; NUM_CLASSES];
        for (c, alpha) in self.alphas.iter().enumerate() {
            margins[c] = alpha.iter().zip(&kernel_row).map(|(&a, &k)| a * k).sum();
        }
        margins
    }

    fn proba_one(&self, row: &[f64]) -> [f64; NUM_CLASSES] {
        softmax(self.margins(row))
    }
}

impl Default for KernelModel {
    fn default() -> Self {
        Self::new(KernelParams::default())
    }
}

impl BaseClassifier for KernelModel {
    fn train(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<()> {
        let cols = validate_training_data(x, y)?;
        self.num_features = cols;
        let n = x.len();

        self.gamma = match self.params.gamma {
            Some(g) => g,
            None => {
                // sklearn-style "scale": 1 / (d * mean feature variance).
                let mut variance_sum = 0.0;
                for col in 0..cols {
                    let mean: f64 = x.iter().map(|r| r[col]).sum::<f64>() / n as f64;
                    variance_sum +=
                        x.iter().map(|r| (r[col] - mean) * (r[col] - mean)).sum::<f64>() / n as f64;
                }
                let mean_variance = variance_sum / cols as f64;
                if mean_variance > 0.0 {
                    1.0 / (cols as f64 * mean_variance)
                } else {
                    1.0 / cols as f64
                }
            }
        };

        self.support = x.to_vec();

        // Gram matrix with ridge on the diagonal.
        let mut gram = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in i..n {
                let k = self.rbf(&x[i], &x[j]);
                gram[i][j] = k;
                gram[j][i] = k;
            }
            gram[i][i] += self.params.lambda;
        }

        self.alphas = (0..NUM_CLASSES)
            .map(|class| {
                let targets: Vec<f64> = y
                    .iter()
                    .map(|&label| if label == class { 1.0 } else { -1.0 })
                    .collect();
                solve(gram.clone(), targets)
            })
            .collect::<Result<Vec<_>>>()?;

        let report = accuracy(&self.predict(x)?, y);
        tracing::info!(
            samples = n,
            features = cols,
            gamma = self.gamma,
            training_accuracy = report,
            "kernel model trained"
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

    /// All zeros: the RBF kernel has no linear per-feature importance.
    fn feature_importance(&self) -> Vec<f64> {
        vec![0.0; self.num_features]
    }
}

fn softmax(mut scores: [f64; NUM_CLASSES]) -> [f64; NUM_CLASSES] {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    for s in &mut scores {
        *s = (*s - max).exp();
    }
    let sum: f64 = scores.iter().sum();
    scores.map(|s| s / sum)
}

/// Solve `a · x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        // Pivot on the largest magnitude entry in this column.
        let pivot = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(CoreError::InvalidTrainingData(
                "singular kernel system".into(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for col in row + 1..n {
            sum -= a[row][col] * x[col];
        }
        x[row] = sum / a[row][row];
    }
    Ok(x)
}
