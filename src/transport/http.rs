use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;

use crate::app::{BbError, Result};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Credentials attached to every request of one provider.
#[derive(Clone)]
pub enum Credentials {
    Basic { username: String, secret: String },
    Bearer(String),
    Anonymous,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => write!(f, "Basic({username}, ***)"),
            Self::Bearer(_) => write!(f, "Bearer(***)"),
            Self::Anonymous => write!(f, "Anonymous"),
        }
    }
}

/// reqwest-backed transport.
///
/// The `Client` is a handle onto a shared connection pool, so one client can
/// back the transports of every provider and any number of in-flight calls.
pub struct HttpTransport {
    client: Client,
    credentials: Credentials,
}

impl HttpTransport {
    pub fn new(client: Client, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    pub fn build_client() -> Result<Client> {
        Client::builder()
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("bb/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BbError::Other(format!("Failed to build HTTP client: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .header(ACCEPT, "application/json");

        builder = match &self.credentials {
            Credentials::Basic { username, secret } => builder.basic_auth(username, Some(secret)),
            Credentials::Bearer(token) => builder.bearer_auth(token),
            Credentials::Anonymous => builder,
        };

        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BbError::transport(&request.url, e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| BbError::transport(&request.url, e))?
            .to_vec();

        tracing::trace!("{} {} -> {}", request.method, request.url, status);

        Ok(HttpResponse { status, body })
    }
}
