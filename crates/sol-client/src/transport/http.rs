use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, trace};

use super::{parse_response, RpcRequest, RpcTransport};
use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::error::ClientError;

/// JSON-RPC 2.0 over HTTP POST.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    request_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        Self::new_with_timeout(url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn new_with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            request_id: AtomicU64::new(0),
        })
    }

    fn connectivity(&self, message: impl Into<String>) -> ClientError {
        ClientError::Connectivity {
            endpoint: self.url.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, request: RpcRequest, params: Value) -> Result<Value, ClientError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = request.build_request_json(id, params);
        trace!(method = %request, id, "sending request");

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.connectivity(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(|v| format!(", retry after {v}s"))
                .unwrap_or_default();
            debug!(method = %request, %status, endpoint = %self.url, "request failed");
            let message = if status == StatusCode::TOO_MANY_REQUESTS {
                format!("rate limited ({status}){retry_after}")
            } else {
                format!("HTTP {status}{retry_after}")
            };
            return Err(self.connectivity(message));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ClientError::unexpected(request.method(), e.to_string()))?;
        parse_response(request.method(), json)
    }

    fn url(&self) -> String {
        self.url.clone()
    }
}
