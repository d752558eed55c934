//! The scoring service: fusion engine plus ensemble (or fallback) scoring.
//!
//! Constructed explicitly once at process start and passed by reference
//! into whatever serves it; there is no module-level singleton.

pub mod attribution;
pub mod fallback;

use crate::capture::CaptureSession;
use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::fusion::FusionEngine;
use crate::model::EnsembleModel;
use crate::schema;
use crate::types::ScoringResult;
use chrono::Utc;
use fallback::FallbackScorer;
use std::path::Path;
use std::time::Duration;

/// Scoring cadence used when no configuration is supplied.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Runs feature extraction and model inference for live scoring.
///
/// With no trained ensemble loaded, every score comes from the rule-based
/// fallback: the serving path never hard-fails just because a trained
/// artifact is missing.
pub struct ScoringService {
    engine: FusionEngine,
    model: Option<EnsembleModel>,
    fallback: FallbackScorer,
    interval: Duration,
}

impl ScoringService {
    pub fn new(engine: FusionEngine) -> Self {
        Self {
            engine,
            model: None,
            fallback: FallbackScorer::new(),
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Build the whole serving stack from configuration: engine window and
    /// queue capacity, scoring cadence, and the trained bundle at
    /// `config.model_path` (absent bundle means the fallback serves).
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut service = Self::new(FusionEngine::from_config(config));
        service.interval = config.scoring_interval;
        service.load_model(&config.model_path)?;
        Ok(service)
    }

    /// Configured scoring cadence.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn engine(&self) -> &FusionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut FusionEngine {
        &mut self.engine
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Load a trained bundle from disk.
    ///
    /// A missing or unreadable artifact is absorbed (the fallback keeps
    /// serving); a present-but-misaligned bundle is refused loudly.
    pub fn load_model(&mut self, path: &Path) -> Result<()> {
        match EnsembleModel::load(path) {
            Ok((model, scaler)) => {
                self.install_model(model)?;
                self.engine.set_scaler(scaler);
                Ok(())
            }
            Err(CoreError::ModelUnavailable(reason)) => {
                tracing::warn!(%reason, "no trained ensemble; serving fallback predictions");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    /// Install an already-built trained model (e.g. straight from training).
    ///
    /// The model's feature ordering must match the live schema exactly;
    /// anything else would silently misalign columns.
    pub fn install_model(&mut self, model: EnsembleModel) -> Result<()> {
        if !model.is_trained() {
            return Err(CoreError::NotTrained);
        }
        if model.feature_names() != schema::feature_names() {
            return Err(CoreError::SchemaMismatch(
                "model feature ordering does not match the live schema".into(),
            ));
        }
        self.model = Some(model);
        Ok(())
    }

    /// Drive a capture session for a fixed number of scoring cycles.
    ///
    /// Each cycle pumps the session's channels into the fusion buffers,
    /// produces one prediction, then waits out the configured interval
    /// before the next cycle.
    pub fn run_session(
        &self,
        session: &CaptureSession,
        cycles: usize,
    ) -> Result<Vec<ScoringResult>> {
        let mut results = Vec::with_capacity(cycles);
        for cycle in 0..cycles {
            let routed = session.pump_into(&self.engine);
            let result = self.score_now()?;
            tracing::debug!(cycle, routed, level = %result.load_level, "scoring cycle");
            results.push(result);
            if cycle + 1 < cycles {
                std::thread::sleep(self.interval);
            }
        }
        Ok(results)
    }

    /// Produce one prediction from the currently buffered window.
    pub fn score_now(&self) -> Result<ScoringResult> {
        let vector = self.engine.extract();

        let Some(model) = &self.model else {
            return Ok(self.fallback.score(&vector));
        };

        let array = vector.to_array()?;
        let scaled = self.engine.normalize(array)?;
        let details = model.predict_with_details(&scaled)?;

        // Attribution uses the raw (unscaled) feature magnitudes.
        let modality_scores = attribution::modality_attribution(&model.feature_importance(), &vector);

        Ok(ScoringResult {
            load_level: details.load_level,
            confidence: details.confidence,
            probabilities: details.probabilities,
            modality_scores,
            per_model: Some(details.per_model),
            timestamp: Utc::now(),
            degraded: false,
        })
    }
}
