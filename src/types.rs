//! Shared result types for the scoring pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Predicted cognitive load level.
///
/// Class indices are fixed: 0 = low, 1 = medium, 2 = high. This mapping is
/// shared by training labels and inference output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadLevel {
    Low,
    Medium,
    High,
}

impl LoadLevel {
    /// Map a class index to its level. Out-of-range indices clamp to High.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => LoadLevel::Low,
            1 => LoadLevel::Medium,
            _ => LoadLevel::High,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            LoadLevel::Low => 0,
            LoadLevel::Medium => 1,
            LoadLevel::High => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadLevel::Low => "low",
            LoadLevel::Medium => "medium",
            LoadLevel::High => "high",
        }
    }
}

impl std::fmt::Display for LoadLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of load classes.
pub const NUM_CLASSES: usize = 3;

/// Per-modality contribution breakdown. The three fields sum to 1.0 ± ε.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalityScores {
    pub visual: f64,
    pub behavioral: f64,
    pub audio: f64,
}

impl ModalityScores {
    /// Fixed triple returned when every attribution bucket is zero.
    pub const FALLBACK: ModalityScores = ModalityScores {
        visual: 0.33,
        behavioral: 0.33,
        audio: 0.34,
    };

    pub fn sum(&self) -> f64 {
        self.visual + self.behavioral + self.audio
    }
}

/// Each base model's independent label, for explainability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerModelLabels {
    pub forest: LoadLevel,
    pub boost: LoadLevel,
    pub kernel: LoadLevel,
}

/// A single cognitive load prediction handed to the delivery layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Predicted level
    pub load_level: LoadLevel,
    /// Winning class probability (or the fixed fallback confidence)
    pub confidence: f64,
    /// Per-class probabilities [low, medium, high], summing to 1.0 ± ε
    pub probabilities: [f64; NUM_CLASSES],
    /// Per-modality contribution, summing to 1.0 ± ε
    pub modality_scores: ModalityScores,
    /// Base model labels (None on the fallback path)
    pub per_model: Option<PerModelLabels>,
    /// When the prediction was produced
    pub timestamp: DateTime<Utc>,
    /// True when produced by the rule-based fallback scorer
    pub degraded: bool,
}
