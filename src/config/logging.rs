//! `[logging]` section
//!
//! Log lines go to stderr so `watch --json` and `fetch` output on stdout stays
//! machine-readable. `RUST_LOG` replaces the filter built from this section
//! entirely; `EDGEPULSE_LOG_LEVEL` and `EDGEPULSE_LOG_FORMAT` only override
//! the matching field.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

use super::error::ConfigError;

/// Modules that accept a `component_levels` override. Each maps to the
/// `edgepulse::<name>` tracing target.
pub const COMPONENTS: &[&str] = &[
    "alerts", "cli", "config", "fetch", "metrics", "notify", "router", "stream",
];

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, one event per line
    #[default]
    Pretty,
    /// One JSON object per event, for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for every target without a component override
    pub level: String,
    pub format: LogFormat,
    /// Per-module levels, e.g. `{ stream = "debug", fetch = "warn" }`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_levels: Option<HashMap<String, String>>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            component_levels: None,
        }
    }
}

impl LoggingConfig {
    /// Rejects levels `EnvFilter` would not understand and component names
    /// that match no module, which would otherwise be ignored without a word.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if LevelFilter::from_str(&self.level).is_err() {
            return Err(ConfigError::invalid(
                "logging.level",
                format!("unknown level '{}'", self.level),
            ));
        }

        let Some(component_levels) = &self.component_levels else {
            return Ok(());
        };
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            if !COMPONENTS.contains(&component.as_str()) {
                return Err(ConfigError::invalid(
                    "logging.component_levels",
                    format!(
                        "unknown component '{}' (expected one of {})",
                        component,
                        COMPONENTS.join(", ")
                    ),
                ));
            }
            if LevelFilter::from_str(level).is_err() {
                return Err(ConfigError::invalid(
                    "logging.component_levels",
                    format!("unknown level '{}' for {}", level, component),
                ));
            }
        }

        Ok(())
    }
}
