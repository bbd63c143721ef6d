//! HTTP transport for polled resources.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::error::FetchError;
use super::request::ResourceRequest;

/// Something that can produce the JSON body for a resource request.
#[async_trait]
pub trait ResourceFetcher: Send + Sync + 'static {
    async fn fetch(&self, request: &ResourceRequest) -> Result<Value, FetchError>;
}

/// `GET <base_url><resource>?<query>` over reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
}

impl HttpFetcher {
    /// Create a fetcher with its own pooled client.
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        Ok(Self::with_client(base_url, timeout_seconds, client))
    }

    /// Create a fetcher with a caller-supplied client (for testing).
    pub fn with_client(
        base_url: impl Into<String>,
        timeout_seconds: u64,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_seconds,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a resource path, without the query.
    pub fn url_for(&self, resource: &str) -> String {
        if resource.starts_with("http://") || resource.starts_with("https://") {
            resource.to_string()
        } else if resource.starts_with('/') {
            format!("{}{}", self.base_url, resource)
        } else {
            format!("{}/{}", self.base_url, resource)
        }
    }

    /// Classify reqwest error into FetchError.
    fn classify_error(e: reqwest::Error, timeout_seconds: u64) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(timeout_seconds)
        } else if e.is_builder() {
            FetchError::InvalidRequest(e.to_string())
        } else {
            FetchError::Connection(e.to_string())
        }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, request: &ResourceRequest) -> Result<Value, FetchError> {
        let url = self.url_for(&request.resource);

        let response = self
            .client
            .get(&url)
            .query(&request.query)
            .send()
            .await
            .map_err(|e| Self::classify_error(e, self.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::classify_error(e, self.timeout_seconds))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
