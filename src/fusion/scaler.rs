//! Z-score feature scaling fitted offline and applied at inference.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Per-column standardization: (x - mean) / std.
///
/// Columns with zero variance scale by 1.0 so constant features pass
/// through unchanged instead of exploding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and standard deviations from a feature matrix.
    pub fn fit(matrix: &[Vec<f64>]) -> Result<Self> {
        let rows = matrix.len();
        if rows == 0 {
            return Err(CoreError::InvalidTrainingData(
                "cannot fit scaler on an empty matrix".into(),
            ));
        }
        let cols = matrix[0].len();
        if matrix.iter().any(|row| row.len() != cols) {
            return Err(CoreError::InvalidTrainingData(
                "ragged feature matrix".into(),
            ));
        }

        let mut means = vec![0.0; cols];
        for row in matrix {
            for (m, &v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= rows as f64;
        }

        let mut stds = vec![0.0; cols];
        for row in matrix {
            for ((s, &v), &m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (v - m) * (v - m);
            }
        }
        for s in &mut stds {
            *s = (*s / rows as f64).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        tracing::info!(rows, cols, "fitted feature scaler");
        Ok(Self { means, stds })
    }

    /// Number of columns this scaler was fitted on.
    pub fn num_features(&self) -> usize {
        self.means.len()
    }

    /// Standardize one feature row.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.means.len() {
            return Err(CoreError::SchemaMismatch(format!(
                "scaler fitted on {} features, got {}",
                self.means.len(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(&v, (&m, &s))| (v - m) / s)
            .collect())
    }

    /// Standardize a full matrix.
    pub fn transform_matrix(&self, matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        matrix.iter().map(|row| self.transform(row)).collect()
    }
}
