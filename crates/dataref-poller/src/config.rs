//! Poller configuration.
//!
//! ```toml
//! [client]
//! host = "127.0.0.1"
//! port = 49000
//! read_timeout = "3s"
//!
//! [poll]
//! interval = "3s"
//! concurrent = true
//!
//! [[datarefs]]
//! name = "sim/cockpit2/controls/parking_brake_ratio"
//! type = "float"
//! ```

use dataref_client::{ClientConfig, ConfigError, DataRefName, DataRefType};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// One dataref to poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollEntry {
    pub name: DataRefName,
    #[serde(rename = "type")]
    pub data_type: DataRefType,
}

impl PollEntry {
    fn new(name: &str, data_type: DataRefType) -> Option<Self> {
        DataRefName::new(name)
            .ok()
            .map(|name| Self { name, data_type })
    }
}

/// Polling schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Time between the starts of consecutive rounds
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Issue all reads of a round at once instead of one after another
    pub concurrent: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            concurrent: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub client: ClientConfig,
    pub poll: PollSettings,
    pub datarefs: Vec<PollEntry>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            poll: PollSettings::default(),
            datarefs: default_datarefs(),
        }
    }
}

/// Cockpit switches every X-Plane aircraft exposes.
fn default_datarefs() -> Vec<PollEntry> {
    [
        ("sim/cockpit2/controls/parking_brake_ratio", DataRefType::Float),
        ("sim/cockpit2/engine/actuators/throttle_ratio", DataRefType::Float),
        ("sim/cockpit2/engine/actuators/eng_master", DataRefType::IntArray),
        ("sim/cockpit2/electrical/battery_on", DataRefType::IntArray),
    ]
    .into_iter()
    .filter_map(|(name, data_type)| PollEntry::new(name, data_type))
    .collect()
}

impl PollerConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, PollerConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| PollerConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML. Missing tables and fields take their defaults.
    pub fn from_toml(text: &str) -> Result<Self, PollerConfigError> {
        toml::from_str(text).map_err(|e| PollerConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), PollerConfigError> {
        self.client.validate()?;
        if self.poll.interval.is_zero() {
            return Err(PollerConfigError::Invalid(
                "poll interval cannot be 0".into(),
            ));
        }
        if self.datarefs.is_empty() {
            return Err(PollerConfigError::Invalid("no datarefs to poll".into()));
        }
        Ok(())
    }
}

/// Poller configuration errors
#[derive(Debug, Error)]
pub enum PollerConfigError {
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("invalid TOML: {0}")]
    Parse(String),

    #[error(transparent)]
    Client(#[from] ConfigError),

    #[error("invalid poll settings: {0}")]
    Invalid(String),
}
