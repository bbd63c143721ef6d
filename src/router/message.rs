//! Wire frames exchanged with the event source.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::alerts::{AlertStatus, PointOfPresence, Severity};
use crate::router::error::ProtocolError;

/// Frames sent from the client to the event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Topic subscription, sent once per successful connect
    Subscribe { topics: Vec<String> },
    /// Heartbeat
    Ping,
}

impl OutboundMessage {
    pub fn to_json(&self) -> String {
        // Serializing a plain enum of strings cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Payload of an `alert` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub severity: Severity,
    pub pop: PointOfPresence,
    pub message: String,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub status: Option<AlertStatus>,
}

/// Analysis block of a `regression_detected` frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegressionAnalysis {
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub regression_factor: Option<f64>,
}

/// Payload of a `regression_detected` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct RegressionPayload {
    pub pop: PointOfPresence,
    #[serde(default)]
    pub analysis: RegressionAnalysis,
}

/// Frames received from the event source, one variant per declared `type`.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Welcome { message: Option<String> },
    SubscriptionConfirmed { topics: Vec<String> },
    Pong,
    Alert(AlertPayload),
    RegressionDetected(RegressionPayload),
    MetricsUpdate(Map<String, Value>),
    /// Any `type` this client does not know about
    Unknown(String),
}

impl InboundMessage {
    /// Parses a raw text frame.
    ///
    /// The `type` tag is read first so that unrecognized types still parse
    /// (as [`InboundMessage::Unknown`]) instead of failing.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(mut frame) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let kind = match frame.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(ProtocolError::MissingType),
        };

        let message = match kind.as_str() {
            "welcome" => InboundMessage::Welcome {
                message: frame
                    .remove("message")
                    .and_then(|m| m.as_str().map(str::to_string)),
            },
            "subscription_confirmed" => InboundMessage::SubscriptionConfirmed {
                topics: match frame.remove("topics") {
                    Some(topics) => serde_json::from_value(topics)
                        .map_err(|e| ProtocolError::payload(&kind, e))?,
                    None => Vec::new(),
                },
            },
            "pong" => InboundMessage::Pong,
            "alert" => InboundMessage::Alert(take_data(&mut frame, &kind)?),
            "regression_detected" => {
                InboundMessage::RegressionDetected(take_data(&mut frame, &kind)?)
            }
            "metrics_update" => match frame.remove("data") {
                Some(Value::Object(data)) => InboundMessage::MetricsUpdate(data),
                _ => {
                    return Err(ProtocolError::InvalidPayload {
                        kind: kind.clone(),
                        reason: "data must be a JSON object".to_string(),
                    })
                }
            },
            _ => InboundMessage::Unknown(kind.clone()),
        };

        Ok(message)
    }

    /// The declared frame type, as sent on the wire.
    pub fn kind(&self) -> &str {
        match self {
            InboundMessage::Welcome { .. } => "welcome",
            InboundMessage::SubscriptionConfirmed { .. } => "subscription_confirmed",
            InboundMessage::Pong => "pong",
            InboundMessage::Alert(_) => "alert",
            InboundMessage::RegressionDetected(_) => "regression_detected",
            InboundMessage::MetricsUpdate(_) => "metrics_update",
            InboundMessage::Unknown(kind) => kind,
        }
    }

    /// Frame-type label for metrics. Unrecognized types share one label.
    pub fn metric_label(&self) -> &'static str {
        match self {
            InboundMessage::Welcome { .. } => "welcome",
            InboundMessage::SubscriptionConfirmed { .. } => "subscription_confirmed",
            InboundMessage::Pong => "pong",
            InboundMessage::Alert(_) => "alert",
            InboundMessage::RegressionDetected(_) => "regression_detected",
            InboundMessage::MetricsUpdate(_) => "metrics_update",
            InboundMessage::Unknown(_) => "unknown",
        }
    }
}

fn take_data<T: serde::de::DeserializeOwned>(
    frame: &mut Map<String, Value>,
    kind: &str,
) -> Result<T, ProtocolError> {
    let data = frame.remove("data").ok_or_else(|| ProtocolError::InvalidPayload {
        kind: kind.to_string(),
        reason: "missing data".to_string(),
    })?;
    serde_json::from_value(data).map_err(|e| ProtocolError::payload(kind, e))
}
