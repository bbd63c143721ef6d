//! Error types for the event-stream transport.

use thiserror::Error;

/// Transport failures. These never reach callers as errors; the connection
/// manager turns them into state transitions and log records.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Handshake did not complete in time
    #[error("connect timeout after {0}ms")]
    ConnectTimeout(u64),

    /// Handshake failed
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// Read or write on an open socket failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Peer closed the socket
    #[error("connection closed by peer")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => StreamError::Closed,
            other => StreamError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            StreamError::ConnectTimeout(10_000).to_string(),
            "connect timeout after 10000ms"
        );
        assert_eq!(
            StreamError::ConnectFailed("refused".to_string()).to_string(),
            "connection failed: refused"
        );
        assert_eq!(StreamError::Closed.to_string(), "connection closed by peer");
    }

    #[test]
    fn test_closed_maps_from_tungstenite() {
        let err: StreamError = tokio_tungstenite::tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(err, StreamError::Closed));
    }
}
