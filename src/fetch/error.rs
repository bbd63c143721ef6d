//! Error types for the polling fetch layer.

use thiserror::Error;

/// Errors that can occur while fetching a resource.
///
/// `Clone` because one outcome is handed to every caller coalesced onto the
/// same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Request timeout
    #[error("request timeout after {0}s")]
    Timeout(u64),

    /// Connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// Non-success HTTP status
    #[error("HTTP error: {0}")]
    Http(u16),

    /// Body was not valid JSON
    #[error("invalid response: {0}")]
    Decode(String),

    /// The fetch task panicked or was cancelled
    #[error("fetch aborted: {0}")]
    Aborted(String),

    /// Request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Short label used for the fetch-outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "timeout",
            FetchError::Connection(_) => "connection",
            FetchError::Http(_) => "http_error",
            FetchError::Decode(_) => "decode_error",
            FetchError::Aborted(_) => "aborted",
            FetchError::InvalidRequest(_) => "invalid_request",
        }
    }
}
