use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::payload::NonFinitePolicy;
use crate::sample::DEFAULT_TIMESTAMP_OFFSET_SECS;
use crate::upload::parse_endpoint;

/// Uploader configuration, loadable from a TOML file.
/// Missing keys fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    /// Collection endpoint receiving the POSTed batches
    pub endpoint: String,
    /// Overrides the host device identifier when set
    pub device_id: Option<String>,
    /// Added to every capture timestamp
    pub timestamp_offset_secs: i64,
    /// Encoding of NaN/Infinity fields
    pub non_finite: NonFinitePolicy,
    /// Poll interval of the accelerometer/gravity sources
    pub sensor_interval_ms: u64,
    /// Poll interval of the location source
    pub location_interval_ms: u64,
    /// Capacity of the collector command queue
    pub channel_capacity: usize,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/submit_data".to_string(),
            device_id: None,
            timestamp_offset_secs: DEFAULT_TIMESTAMP_OFFSET_SECS,
            non_finite: NonFinitePolicy::Reject,
            sensor_interval_ms: 20,
            location_interval_ms: 1000,
            channel_capacity: 500,
        }
    }
}

impl UploaderConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: UploaderConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_endpoint(&self.endpoint).map_err(|e| ConfigError::Validation(e.to_string()))?;

        if let Some(id) = &self.device_id {
            if id.trim().is_empty() {
                return Err(ConfigError::Validation("device_id must not be blank".to_string()));
            }
        }

        if self.sensor_interval_ms == 0 || self.location_interval_ms == 0 {
            return Err(ConfigError::Validation("Sensor intervals must be positive".to_string()));
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::Validation("Channel capacity must be positive".to_string()));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Parse error: {0}")]
    Parse(toml::de::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}
