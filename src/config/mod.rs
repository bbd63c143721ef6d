//! Configuration module for EdgePulse
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`EDGEPULSE_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use edgepulse::config::EdgePulseConfig;
//!
//! let toml = r#"
//! [stream]
//! url = "wss://edge.example.com/ws"
//! "#;
//! let config: EdgePulseConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.stream.url, "wss://edge.example.com/ws");
//! assert_eq!(config.alerts.capacity, 50);
//! ```

pub mod error;
pub mod logging;

pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};

// Section types owned by their components
pub use crate::fetch::PollingConfig;
pub use crate::metrics::MetricsConfig;
pub use crate::stream::StreamConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::alerts::DEFAULT_ALERT_CAPACITY;

/// Alert store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Maximum number of alerts retained, newest first
    pub capacity: usize,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_ALERT_CAPACITY,
        }
    }
}

/// Unified configuration for the EdgePulse client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EdgePulseConfig {
    /// Live event stream connection
    pub stream: StreamConfig,
    /// REST polling and cache
    pub polling: PollingConfig,
    /// Alert store
    pub alerts: AlertsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Prometheus exporter
    pub metrics: MetricsConfig,
}

impl EdgePulseConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are silently ignored (previous values are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("EDGEPULSE_STREAM_URL") {
            self.stream.url = url;
        }
        if let Ok(url) = std::env::var("EDGEPULSE_API_URL") {
            self.polling.base_url = url;
        }
        if let Ok(ttl) = std::env::var("EDGEPULSE_CACHE_TTL_MS") {
            if let Ok(ms) = ttl.parse() {
                self.polling.cache_ttl_ms = ms;
            }
        }

        if let Ok(level) = std::env::var("EDGEPULSE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("EDGEPULSE_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let stream = &self.stream;
        if !(stream.url.starts_with("ws://") || stream.url.starts_with("wss://")) {
            return Err(ConfigError::invalid(
                "stream.url",
                "must start with ws:// or wss://",
            ));
        }
        if stream.topics.is_empty() {
            return Err(ConfigError::invalid(
                "stream.topics",
                "at least one topic is required",
            ));
        }
        if stream.heartbeat_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "stream.heartbeat_interval_ms",
                "must be non-zero",
            ));
        }
        if stream.reconnect_max_delay_ms < stream.reconnect_base_delay_ms {
            return Err(ConfigError::invalid(
                "stream.reconnect_max_delay_ms",
                format!(
                    "must be >= reconnect_base_delay_ms ({})",
                    stream.reconnect_base_delay_ms
                ),
            ));
        }

        let base_url = &self.polling.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "polling.base_url",
                "must start with http:// or https://",
            ));
        }

        if self.alerts.capacity == 0 {
            return Err(ConfigError::invalid("alerts.capacity", "must be non-zero"));
        }

        self.logging.validate()?;

        if let Err(e) = self.metrics.listen_addr() {
            return Err(ConfigError::invalid(
                "metrics.prometheus_listen",
                e.to_string(),
            ));
        }

        Ok(())
    }
}
