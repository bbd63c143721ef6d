//! Resource requests and their cache signatures.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// A polled resource: path, query parameters and an optional explicit cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// Path relative to the polling base URL (e.g. "/api/alerts")
    pub resource: String,
    /// Query parameters, in caller order
    #[serde(default)]
    pub query: Vec<(String, String)>,
    /// Overrides the derived signature when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
}

impl ResourceRequest {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            query: Vec::new(),
            cache_key: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Deterministic identity of this request.
    ///
    /// The explicit cache key if one is set; otherwise the resource followed by
    /// the query pairs sorted by key then value, so parameter order never
    /// splits the cache. Keys and values are form-encoded, so a value holding
    /// `&` or `=` cannot pass for extra parameters.
    pub fn signature(&self) -> String {
        if let Some(key) = &self.cache_key {
            return key.clone();
        }
        if self.query.is_empty() {
            return self.resource.clone();
        }

        let mut pairs: Vec<&(String, String)> = self.query.iter().collect();
        pairs.sort();
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        format!("{}?{}", self.resource, query)
    }
}

/// Parses a `key=value` argument.
pub fn parse_query_pair(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", arg)),
    }
}
