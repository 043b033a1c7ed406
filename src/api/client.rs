use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::app::{BbError, Result};
use crate::transport::{is_success, HttpRequest, Transport};

/// A provider's REST root plus the transport that reaches it.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport + Send + Sync>,
    base_url: String,
    timeout: Option<Duration>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport + Send + Sync>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an endpoint against the base URL. Absolute URLs pass through.
    pub fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
        }
    }

    /// Send one request and return the body of a successful response.
    pub async fn send(&self, method: Method, endpoint: &str, body: Option<Vec<u8>>) -> Result<Vec<u8>> {
        let url = self.url(endpoint);
        let mut request = HttpRequest::new(method.clone(), &url).with_timeout(self.timeout);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let response = self.transport.execute(request).await?;

        if !is_success(&method, response.status) {
            return Err(BbError::RemoteStatus {
                endpoint: url,
                status: response.status,
                body: response.body_text(),
            });
        }

        Ok(response.body)
    }

    pub async fn get(&self, endpoint: &str) -> Result<Vec<u8>> {
        self.send(Method::GET, endpoint, None).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let body = self.get(endpoint).await?;
        serde_json::from_slice(&body).map_err(|e| BbError::decode(self.url(endpoint), e))
    }
}
