//! CogniSense core - real-time cognitive load estimation from multimodal
//! desktop signals.
//!
//! The pipeline buffers four sensor streams (facial landmarks, keyboard,
//! mouse, microphone), fuses a time-windowed fixed-schema feature vector,
//! and scores it with a weighted soft-voting ensemble. When no trained
//! model is available a rule-based fallback keeps producing predictions,
//! flagged as degraded.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       CogniSense Core                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌────────────┐   ┌────────────────────┐    │
//! │  │  Capture  │──▶│   Fusion   │──▶│   Scoring Service  │    │
//! │  │ (4 adapters)│ │ (buffers + │   │ (ensemble | rules) │    │
//! │  └───────────┘   │  features) │   └────────────────────┘    │
//! │                  └────────────┘            │                 │
//! │                        │                   ▼                 │
//! │                        ▼            ┌────────────┐          │
//! │                 ┌────────────┐      │ Attribution │          │
//! │                 │   Schema   │      │ (modality)  │          │
//! │                 │ (46 keys)  │      └────────────┘          │
//! │                 └────────────┘                               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cognisense::fusion::FusionEngine;
//! use cognisense::scoring::ScoringService;
//! use std::path::Path;
//!
//! let mut service = ScoringService::new(FusionEngine::default());
//! // Absent artifact is fine: the fallback scorer serves instead.
//! service.load_model(Path::new("models/ensemble.json")).ok();
//!
//! let result = service.score_now().expect("scoring failed");
//! println!("{:?} ({:.2})", result.load_level, result.confidence);
//! ```

pub mod buffer;
pub mod capture;
pub mod config;
pub mod error;
pub mod features;
pub mod fusion;
pub mod model;
pub mod schema;
pub mod scoring;
pub mod types;

// Re-export key types at crate root for convenience
pub use capture::{CaptureSession, SensorAdapter, SensorSignal, SignalSource};
pub use config::{Config, ModalityConfig};
pub use error::{CoreError, Result};
pub use fusion::FusionEngine;
pub use model::{EnsembleModel, EnsembleWeights, TrainingReport};
pub use schema::{FeatureVector, FEATURE_COUNT};
pub use scoring::ScoringService;
pub use types::{LoadLevel, ModalityScores, ScoringResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
