//! Error types for the CogniSense core.

use thiserror::Error;

/// Errors that can occur in the buffering, fusion, and scoring pipeline.
///
/// Adapter-level failures are scoped to a single modality and never
/// propagate across sibling adapters or into the fusion engine. Schema and
/// weight errors are raised synchronously to the immediate caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sensor adapter could not open or read its underlying device.
    /// Fatal only to that modality; the others keep running.
    #[error("sensor unavailable ({modality}): {reason}")]
    SensorUnavailable { modality: &'static str, reason: String },

    /// The adapter is already running.
    #[error("adapter already running ({0})")]
    AlreadyRunning(&'static str),

    /// Feature vector key set or ordering diverges from what the trained
    /// model expects. Scoring refuses rather than misaligning columns.
    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),

    /// No usable trained artifact. The serving path absorbs this and
    /// routes to the fallback scorer.
    #[error("no trained model available: {0}")]
    ModelUnavailable(String),

    /// Ensemble combination weights are unusable (negative, or all zero).
    #[error("degenerate ensemble weights: weights must be non-negative with a positive sum")]
    DegenerateWeights,

    /// Predict called on a model that has not been trained.
    #[error("model is not trained")]
    NotTrained,

    /// Training input was empty or shaped inconsistently.
    #[error("invalid training data: {0}")]
    InvalidTrainingData(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
