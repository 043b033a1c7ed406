pub mod http;

#[cfg(test)]
pub(crate) mod scripted;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;

use crate::app::Result;

pub use http::{Credentials, HttpTransport};

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// JSON payload, if any
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            timeout: None,
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Moves one request over the wire.
///
/// Implementations report connection failures as errors but hand back any
/// status code untouched; judging statuses is left to the caller.
#[async_trait]
pub trait Transport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Statuses accepted as success for each verb.
pub fn is_success(method: &Method, status: u16) -> bool {
    match *method {
        Method::GET => matches!(status, 200 | 206),
        Method::POST | Method::PUT => matches!(status, 200 | 201 | 204),
        Method::DELETE => matches!(status, 200 | 204),
        _ => (200..300).contains(&status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_keeps_method() {
        let request = HttpRequest::new(Method::DELETE, "https://api.example.com/x")
            .with_timeout(Some(Duration::from_secs(5)));
        assert_eq!(request.method, Method::DELETE);
        assert_eq!(request.url, "https://api.example.com/x");
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_success_statuses_per_verb() {
        assert!(is_success(&Method::GET, 200));
        assert!(is_success(&Method::GET, 206));
        assert!(!is_success(&Method::GET, 201));
        assert!(!is_success(&Method::GET, 204));

        assert!(is_success(&Method::POST, 201));
        assert!(is_success(&Method::PUT, 200));
        assert!(is_success(&Method::DELETE, 204));
        assert!(!is_success(&Method::DELETE, 201));

        assert!(!is_success(&Method::GET, 404));
        assert!(!is_success(&Method::GET, 500));
    }
}
