//! Configuration loading for the trigger provider
//!
//! ```json
//! {
//!   "name": "plant-triggers",
//!   "base_interval_ms": 20,
//!   "warm_up": ["At10Hz", "EverySecond"]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use triggers_core::Frequency;

use crate::decimator::decimation_factor;

/// Root configuration for a trigger provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Provider name, used in logs
    #[serde(default = "default_name")]
    pub name: String,

    /// Base tick interval in milliseconds
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,

    /// Frequencies whose recipes are built at startup
    #[serde(default)]
    pub warm_up: Vec<Frequency>,
}

fn default_name() -> String {
    "triggers".to_string()
}

fn default_base_interval_ms() -> u64 {
    20
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            base_interval_ms: default_base_interval_ms(),
            warm_up: Vec::new(),
        }
    }
}

impl TriggerConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    /// Check the base interval and that every warm-up frequency divides evenly
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "base_interval_ms must be greater than zero".to_string(),
            ));
        }

        for frequency in &self.warm_up {
            let Some(period) = frequency.period() else {
                continue;
            };
            if decimation_factor(period, self.base_interval()).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "{} ({} ms) is not a multiple of the {} ms base interval",
                    frequency,
                    frequency.period_ms(),
                    self.base_interval_ms
                )));
            }
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
