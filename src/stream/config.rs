//! Configuration for the live event stream.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Topics subscribed on every successful connect.
pub const DEFAULT_TOPICS: [&str; 3] = ["alerts", "metrics", "regressions"];

/// Connection, heartbeat and reconnection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// WebSocket endpoint of the event source (`ws://` or `wss://`)
    pub url: String,
    /// Topic set sent in the subscribe frame
    pub topics: Vec<String>,
    /// Milliseconds between heartbeat pings while connected
    pub heartbeat_interval_ms: u64,
    /// First reconnect delay; doubled on each further attempt
    pub reconnect_base_delay_ms: u64,
    /// Upper bound on any reconnect delay
    pub reconnect_max_delay_ms: u64,
    /// Retries allowed before giving up
    pub max_reconnect_attempts: u32,
    /// Time allowed for the socket handshake
    pub connect_timeout_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3001/ws".to_string(),
            topics: DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
            heartbeat_interval_ms: 30_000,
            reconnect_base_delay_ms: 1_000,
            reconnect_max_delay_ms: 30_000,
            max_reconnect_attempts: 5,
            connect_timeout_ms: 10_000,
        }
    }
}

impl StreamConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
