//! Connection state and reconnect backoff tracking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::config::StreamConfig;

/// Lifecycle state of the single event-stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    /// Numeric encoding for the connection-state gauge.
    pub fn as_gauge(&self) -> f64 {
        match self {
            ConnectionState::Disconnected => 0.0,
            ConnectionState::Connecting => 1.0,
            ConnectionState::Connected => 2.0,
            ConnectionState::Error => 3.0,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Bounded exponential backoff.
///
/// `attempt` counts reconnects scheduled since the last successful open.
/// The delay for attempt `n` is `min(base * 2^n, max)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    base: Duration,
    max: Duration,
    max_attempts: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            base,
            max,
            max_attempts,
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(
            Duration::from_millis(config.reconnect_base_delay_ms),
            Duration::from_millis(config.reconnect_max_delay_ms),
            config.max_reconnect_attempts,
        )
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Delay for a given attempt number, without touching state.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // 2^31 already overflows any sane base; saturate instead of wrapping
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Claims the next retry slot.
    ///
    /// Returns the delay to wait, or `None` once `max_attempts` retries have
    /// been scheduled without a successful open in between.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let delay = self.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn default_backoff() -> Backoff {
        Backoff::from_config(&StreamConfig::default())
    }

    #[test]
    fn test_delay_sequence_doubles_then_caps() {
        let backoff = default_backoff();
        let delays: Vec<u128> = (0..8).map(|n| backoff.delay_for(n).as_millis()).collect();
        assert_eq!(
            delays,
            vec![1000, 2000, 4000, 8000, 16000, 30000, 30000, 30000]
        );
    }

    #[test]
    fn test_next_delay_stops_after_max_attempts() {
        let mut backoff = default_backoff();
        let mut scheduled = Vec::new();
        while let Some(delay) = backoff.next_delay() {
            scheduled.push(delay.as_millis());
        }
        assert_eq!(scheduled, vec![1000, 2000, 4000, 8000, 16000]);
        assert_eq!(backoff.attempt(), 5);
        assert!(backoff.is_exhausted());
        assert!(backoff.next_delay().is_none());
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut backoff = default_backoff();
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.attempt(), 2);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_more_attempts_reach_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30), 7);
        let delays: Vec<_> = std::iter::from_fn(|| backoff.next_delay())
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_zero_attempts_never_retries() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30), 0);
        assert!(backoff.next_delay().is_none());
    }

    #[test]
    fn test_state_display_and_gauge() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Error.as_gauge(), 3.0);
    }

    proptest! {
        #[test]
        fn prop_delay_bounded_and_monotonic(attempt in 0u32..64) {
            let backoff = default_backoff();
            let delay = backoff.delay_for(attempt);
            prop_assert!(delay <= Duration::from_millis(30_000));
            prop_assert!(delay >= Duration::from_millis(1_000));
            prop_assert!(backoff.delay_for(attempt + 1) >= delay);
        }
    }
}
