//! Message routing for the live event stream
//!
//! Classifies each inbound frame by its declared `type` and applies the matching
//! state mutation:
//!
//! - `alert` / `regression_detected`: prepend an [`AlertRecord`] and notify
//! - `metrics_update`: shallow-merge into the live metrics snapshot
//! - `welcome`, `subscription_confirmed`, `pong`: informational only
//! - anything else, or anything unparseable: logged and dropped
//!
//! Nothing in here can fail the connection; protocol violations stop at this layer.

pub mod error;
pub mod message;

pub use error::ProtocolError;
pub use message::{
    AlertPayload, InboundMessage, OutboundMessage, RegressionAnalysis, RegressionPayload,
};

use std::sync::Arc;

use chrono::Utc;

use crate::alerts::{AlertRecord, AlertStatus, AlertStore, LiveMetrics, Severity};
use crate::notify::Notifier;
use crate::stream::FrameHandler;

/// Dispatches inbound frames into the alert store and live metrics.
pub struct MessageRouter {
    alerts: Arc<AlertStore>,
    live_metrics: Arc<LiveMetrics>,
    notifier: Notifier,
}

impl MessageRouter {
    pub fn new(alerts: Arc<AlertStore>, live_metrics: Arc<LiveMetrics>, notifier: Notifier) -> Self {
        Self {
            alerts,
            live_metrics,
            notifier,
        }
    }

    pub fn alerts(&self) -> &Arc<AlertStore> {
        &self.alerts
    }

    pub fn live_metrics(&self) -> &Arc<LiveMetrics> {
        &self.live_metrics
    }

    /// Parses and dispatches one raw frame.
    ///
    /// Returns the parse error for frames that were dropped, mostly for tests;
    /// the error has already been logged.
    pub fn route(&self, raw: &str) -> Result<(), ProtocolError> {
        match InboundMessage::parse(raw) {
            Ok(message) => {
                metrics::counter!(crate::metrics::FRAMES_TOTAL, "type" => message.metric_label())
                    .increment(1);
                self.dispatch(message);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, frame_len = raw.len(), "Dropping unparseable frame");
                metrics::counter!(crate::metrics::FRAMES_DROPPED_TOTAL, "reason" => e.reason())
                    .increment(1);
                Err(e)
            }
        }
    }

    /// Applies an already-parsed message.
    pub fn dispatch(&self, message: InboundMessage) {
        match message {
            InboundMessage::Welcome { message } => {
                tracing::info!(message = message.as_deref().unwrap_or(""), "Event source welcome");
            }
            InboundMessage::SubscriptionConfirmed { topics } => {
                tracing::info!(?topics, "Subscription confirmed");
            }
            InboundMessage::Pong => {
                tracing::trace!("Heartbeat acknowledged");
            }
            InboundMessage::Alert(payload) => {
                let record = AlertRecord {
                    id: payload.id,
                    severity: payload.severity,
                    pop: payload.pop,
                    message: payload.message,
                    created_at: payload.created_at.unwrap_or_else(Utc::now),
                    status: payload.status.unwrap_or_default(),
                };
                self.record_alert(record);
            }
            InboundMessage::RegressionDetected(payload) => {
                self.record_alert(regression_alert(payload));
            }
            InboundMessage::MetricsUpdate(data) => {
                tracing::debug!(keys = data.len(), "Merging metrics update");
                self.live_metrics.merge(data);
            }
            InboundMessage::Unknown(kind) => {
                tracing::warn!(kind = %kind, "Ignoring frame with unrecognized type");
            }
        }
    }

    fn record_alert(&self, record: AlertRecord) {
        tracing::info!(
            severity = %record.severity,
            pop = %record.pop.code,
            message = %record.message,
            "Alert received"
        );
        self.notifier
            .alert(record.severity, &record.pop.code, &record.message);
        self.alerts.prepend(record);
    }
}

impl FrameHandler for MessageRouter {
    fn handle_frame(&self, raw: &str) {
        // Already logged and counted inside route()
        let _ = self.route(raw);
    }
}

/// Builds the synthesized record for a `regression_detected` frame.
fn regression_alert(payload: RegressionPayload) -> AlertRecord {
    let location = payload.pop.label().to_string();
    let message = match payload
        .analysis
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(summary) => format!("Performance regression detected at {}: {}", location, summary),
        None => format!("Performance regression detected at {}", location),
    };

    AlertRecord {
        id: None,
        severity: payload.analysis.severity.unwrap_or(Severity::High),
        pop: payload.pop,
        message,
        created_at: Utc::now(),
        status: AlertStatus::Active,
    }
}
