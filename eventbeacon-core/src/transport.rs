//! Delivery of payloads to the collection endpoint
//!
//! The beacon only needs to know whether a send succeeded and, if not,
//! whether the failure is worth retrying (see [`Error::is_retryable`]).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::payload::Payload;

/// Submits one payload
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, payload: &Payload) -> Result<()>;
}

/// Posts payloads as JSON to the configured endpoint
pub struct HttpTransport {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport from agent configuration
    ///
    /// The endpoint is not parsed here; an unusable endpoint fails each send
    /// with [`Error::InvalidEndpoint`].
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.trim().to_string(),
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, payload: &Payload) -> Result<()> {
        let url = reqwest::Url::parse(&self.endpoint).map_err(|e| Error::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            message: e.to_string(),
        })?;

        let response = self
            .http_client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Transport(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }
}
