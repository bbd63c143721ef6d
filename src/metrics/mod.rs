//! # Metrics
//!
//! Metric names recorded across the crate, and the optional Prometheus exporter.
//!
//! ## Metrics Tracked
//!
//! **Counters:**
//! - `edgepulse_frames_total{type}` - Inbound frames routed, by message type
//! - `edgepulse_frames_dropped_total{reason}` - Frames discarded by the router
//! - `edgepulse_reconnects_total` - Scheduled reconnect attempts
//! - `edgepulse_fetches_total{outcome}` - Completed REST fetches
//! - `edgepulse_cache_hits_total` - Fetches answered from a fresh cache entry
//! - `edgepulse_fetch_coalesced_total` - Callers that joined an in-flight fetch
//!
//! **Gauges:**
//! - `edgepulse_connection_state` - 0 disconnected, 1 connecting, 2 connected, 3 error
//! - `edgepulse_alerts_stored` - Alerts held in the store
//! - `edgepulse_alerts_active` - Stored alerts with status `active`
//! - `edgepulse_alerts_critical` - Stored alerts with severity `critical`
//!
//! Recording is a no-op until a recorder is installed, so library users that
//! never call [`setup_metrics`] pay nothing.

use metrics_exporter_prometheus::PrometheusBuilder;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

pub const FRAMES_TOTAL: &str = "edgepulse_frames_total";
pub const FRAMES_DROPPED_TOTAL: &str = "edgepulse_frames_dropped_total";
pub const RECONNECTS_TOTAL: &str = "edgepulse_reconnects_total";
pub const FETCHES_TOTAL: &str = "edgepulse_fetches_total";
pub const CACHE_HITS_TOTAL: &str = "edgepulse_cache_hits_total";
pub const FETCH_COALESCED_TOTAL: &str = "edgepulse_fetch_coalesced_total";

pub const CONNECTION_STATE: &str = "edgepulse_connection_state";
pub const ALERTS_STORED: &str = "edgepulse_alerts_stored";
pub const ALERTS_ACTIVE: &str = "edgepulse_alerts_active";
pub const ALERTS_CRITICAL: &str = "edgepulse_alerts_critical";

/// Prometheus exporter settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Address for the `/metrics` scrape endpoint; disabled when unset
    pub prometheus_listen: Option<String>,
}

impl MetricsConfig {
    /// Parsed listen address, if one is configured.
    pub fn listen_addr(&self) -> Result<Option<SocketAddr>, std::net::AddrParseError> {
        self.prometheus_listen
            .as_deref()
            .map(str::parse)
            .transpose()
    }
}

/// Install the Prometheus recorder and its HTTP listener.
///
/// Returns `Ok(None)` when no listen address is configured. Must be called from
/// within a tokio runtime, at most once per process.
pub fn setup_metrics(
    config: &MetricsConfig,
) -> Result<Option<SocketAddr>, Box<dyn std::error::Error>> {
    let Some(addr) = config.listen_addr()? else {
        return Ok(None);
    };

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    describe();
    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(Some(addr))
}

fn describe() {
    metrics::describe_counter!(FRAMES_TOTAL, "Inbound stream frames routed");
    metrics::describe_counter!(FRAMES_DROPPED_TOTAL, "Inbound stream frames dropped");
    metrics::describe_counter!(RECONNECTS_TOTAL, "Scheduled reconnect attempts");
    metrics::describe_counter!(FETCHES_TOTAL, "Completed resource fetches");
    metrics::describe_counter!(CACHE_HITS_TOTAL, "Fetches served from cache");
    metrics::describe_counter!(FETCH_COALESCED_TOTAL, "Fetches joined to an in-flight request");
    metrics::describe_gauge!(CONNECTION_STATE, "Stream connection state");
    metrics::describe_gauge!(ALERTS_STORED, "Alerts held in memory");
    metrics::describe_gauge!(ALERTS_ACTIVE, "Active alerts held in memory");
    metrics::describe_gauge!(ALERTS_CRITICAL, "Critical alerts held in memory");
}
