//! Error types for inbound frame handling.

use thiserror::Error;

/// Reasons an inbound frame could not be dispatched.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame is not valid JSON
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Frame is valid JSON but not an object
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// Frame has no string `type` field
    #[error("frame has no type")]
    MissingType,

    /// Known type with a payload of the wrong shape
    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload { kind: String, reason: String },
}

impl ProtocolError {
    pub(crate) fn payload(kind: &str, err: serde_json::Error) -> Self {
        ProtocolError::InvalidPayload {
            kind: kind.to_string(),
            reason: err.to_string(),
        }
    }

    /// Short label used for the dropped-frames metric.
    pub fn reason(&self) -> &'static str {
        match self {
            ProtocolError::Malformed(_) => "malformed",
            ProtocolError::NotAnObject => "not_object",
            ProtocolError::MissingType => "missing_type",
            ProtocolError::InvalidPayload { .. } => "invalid_payload",
        }
    }
}
