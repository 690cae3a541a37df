use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::batch::BatchConfig;
use crate::best_average::BestAverageConfig;
use crate::best_effort::BestEffortConfig;
use crate::epsilon::SimplificationConfig;
use crate::error::StrideError;
use crate::logging::LogConfig;
use crate::training_load::TrainingLoadConfig;

/// Main engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Epsilon estimation and stationary filter constants
    pub simplification: SimplificationConfig,

    /// Sport type to target distance table
    pub best_efforts: BestEffortConfig,

    /// Best average interval table
    pub best_averages: BestAverageConfig,

    /// Training load model constants
    pub training_load: TrainingLoadConfig,

    pub logging: LogConfig,

    pub batch: BatchConfig,
}

/// Configuration management implementation
impl EngineConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: EngineConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        // Create directory if it doesn't exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stridemetrics")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();
        if !config_path.exists() {
            debug!("Config file not found, using defaults: {}", config_path.display());
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file {}: {:#}", config_path.display(), e);
                Self::default()
            }
        }
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> std::result::Result<(), StrideError> {
        self.training_load.validate()?;

        let simplification = &self.simplification;
        if !(simplification.min_epsilon > 0.0) || simplification.min_epsilon > simplification.max_epsilon {
            return Err(StrideError::Configuration(format!(
                "epsilon bounds must satisfy 0 < min ({}) <= max ({})",
                simplification.min_epsilon, simplification.max_epsilon
            )));
        }

        if self.best_averages.intervals.contains(&0) {
            return Err(StrideError::Configuration(
                "best average intervals must be positive".to_string(),
            ));
        }

        let bad_rule = self
            .best_efforts
            .rules
            .iter()
            .find(|rule| rule.distances.iter().any(|d| !(*d > 0.0)));
        if let Some(rule) = bad_rule {
            return Err(StrideError::Configuration(format!(
                "best effort distances for {:?} must be positive",
                rule.sport_type
            )));
        }

        Ok(())
    }
}
