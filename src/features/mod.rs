//! Per-modality feature extraction.
//!
//! Each extractor computes its features from a window of buffered records
//! and exposes its canonical key list as a const slice. When a modality has
//! no usable data the extractor returns its full key list zero-valued, so
//! the fused vector keeps a constant size on every call.

pub mod audio;
pub mod behavioral;
pub mod visual;

use statrs::statistics::Statistics;

/// Mean with an empty-input guard.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().mean()
    }
}

/// Population standard deviation with a short-input guard.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        0.0
    } else {
        values.iter().population_std_dev()
    }
}
