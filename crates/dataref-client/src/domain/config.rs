//! Client configuration with validation.
//!
//! Durations are written in humantime form (`"3s"`, `"250ms"`) when the
//! config is loaded from a file.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// How responses are received and routed back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveMode {
    /// A dedicated task owns the receive side and resolves whichever
    /// request each response belongs to. Reads may overlap.
    #[default]
    Background,
    /// Each read sends, then receives on the caller's task until its own
    /// response arrives or the deadline passes. One read at a time.
    PerCall,
}

/// Dataref client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Responder host name or IP address
    pub host: String,
    /// Responder UDP port
    pub port: u16,
    /// Deadline for one read. Per-call reads count time spent queued
    /// behind other reads.
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Receive model
    pub mode: ReceiveMode,
    /// Upper bound on concurrently pending requests
    pub max_in_flight: usize,
    /// How often abandoned pending requests are swept. Background mode only;
    /// the per-call reader releases an abandoned read when its future drops.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Let the per-call reader accept id-less (legacy) responses.
    /// They are matched by arrival order only.
    pub accept_legacy_responses: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 49000,
            read_timeout: Duration::from_secs(3),
            mode: ReceiveMode::Background,
            max_in_flight: 1024,
            sweep_interval: Duration::from_secs(1),
            accept_legacy_responses: false,
        }
    }
}

impl ClientConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidAddress("host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidAddress("port cannot be 0".into()));
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "read_timeout cannot be 0".into(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "sweep_interval cannot be 0".into(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_in_flight cannot be 0".into(),
            ));
        }
        Ok(())
    }

    /// `host:port` of the responder.
    pub fn remote(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}
