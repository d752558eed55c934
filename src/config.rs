//! Configuration for the CogniSense core.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for capture, fusion, and scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Extraction window length in seconds
    pub window_secs: f64,

    /// Capacity of the bounded audio chunk queue
    pub audio_queue_capacity: usize,

    /// Microphone sample rate in Hz
    pub sample_rate: u32,

    /// Camera sampling rate in frames per second
    pub camera_fps: f64,

    /// How often the scoring service produces a prediction
    #[serde(with = "duration_serde")]
    pub scoring_interval: Duration,

    /// Which modalities to capture
    pub modalities: ModalityConfig,

    /// Path of the trained ensemble bundle
    pub model_path: PathBuf,

    /// Path for state and exported results
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cognisense");

        Self {
            window_secs: crate::fusion::DEFAULT_WINDOW_SECS,
            audio_queue_capacity: crate::buffer::chunk_queue::DEFAULT_CAPACITY,
            sample_rate: 16_000,
            camera_fps: 10.0,
            scoring_interval: Duration::from_secs(2),
            modalities: ModalityConfig::default(),
            model_path: data_dir.join("models").join("ensemble.json"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists yet.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cognisense")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        if let Some(parent) = self.model_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }
        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.window_secs > 0.0) {
            return Err(ConfigError::InvalidValue(format!(
                "window_secs must be positive, got {}",
                self.window_secs
            )));
        }
        if self.audio_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "audio_queue_capacity must be at least 1".into(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidValue("sample_rate must be positive".into()));
        }
        Ok(())
    }
}

/// Which modalities to capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalityConfig {
    pub video: bool,
    pub keyboard: bool,
    pub mouse: bool,
    pub audio: bool,
}

impl Default for ModalityConfig {
    fn default() -> Self {
        Self {
            video: true,
            keyboard: true,
            mouse: true,
            audio: true,
        }
    }
}

impl ModalityConfig {
    /// Parse modality selection from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let names: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();
        let has = |name: &str| names.iter().any(|n| n == name || n == "all");

        Self {
            video: has("video"),
            keyboard: has("keyboard"),
            mouse: has("mouse"),
            audio: has("audio"),
        }
    }

    /// Check if at least one modality is enabled.
    pub fn any_enabled(&self) -> bool {
        self.video || self.keyboard || self.mouse || self.audio
    }

    /// Whether the named modality is enabled. Unknown names are disabled.
    pub fn enabled(&self, modality: &str) -> bool {
        match modality {
            "video" => self.video,
            "keyboard" => self.keyboard,
            "mouse" => self.mouse,
            "audio" => self.audio,
            _ => false,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidValue(e) => write!(f, "Invalid value: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
