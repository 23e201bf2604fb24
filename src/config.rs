//! Configuration management for fixpilot
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.fixpilot/config.toml

use crate::analysis::ConvergenceConfig;
use crate::applier::ApplierConfig;
use crate::errors::{FixError, Result};
use crate::proposer::RepositoryLayout;
use crate::telemetry::Verbosity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete configuration for fixpilot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub apply: ApplierConfig,
    #[serde(default)]
    pub convergence: ConvergenceConfig,
    #[serde(default)]
    pub repository: RepositoryLayout,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub default_verbosity: String,
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_verbosity: "normal".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FixError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| FixError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".fixpilot").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let threshold = self.apply.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(FixError::Config(format!(
                "confidence_threshold must be between 0.0 and 1.0, got {}",
                threshold
            )));
        }

        if self.convergence.max_iterations == 0 {
            return Err(FixError::Config(
                "max_iterations must be greater than 0".to_string(),
            ));
        }

        if self.convergence.no_progress_window == 0 {
            return Err(FixError::Config(
                "no_progress_window must be greater than 0".to_string(),
            ));
        }

        if let Some(command) = &self.apply.verify_command {
            if command.is_empty() {
                return Err(FixError::Config(
                    "verify_command must name a program".to_string(),
                ));
            }
        }

        if Verbosity::from_name(&self.telemetry.default_verbosity).is_none() {
            return Err(FixError::Config(format!(
                "Invalid verbosity level: {}",
                self.telemetry.default_verbosity
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| FixError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FixError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| FixError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}
