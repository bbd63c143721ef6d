//! Configuration for polled REST resources.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// REST polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Base URL that resource paths are joined onto
    pub base_url: String,
    /// How long a successful response stays fresh
    pub cache_ttl_ms: u64,
    /// Per-request timeout
    pub request_timeout_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            cache_ttl_ms: 5_000,
            request_timeout_seconds: 10,
        }
    }
}

impl PollingConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}
