//! Production transport over reqwest.

use std::time::Duration;

use crate::http::{HttpRequest, HttpResponse, Method, Transport, TransportError};

/// Connection settings for [`ReqwestTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Origin that relative request paths are resolved against
    pub base_url: String,
    /// Per-request timeout. `None` leaves the client's own behaviour.
    pub timeout: Option<Duration>,
}

impl HttpConfig {
    /// Config for `base_url` with no timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), timeout: None }
    }

    /// Absolute URL for `target`.
    pub fn resolve(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if target.starts_with('/') { format!("{base}{target}") } else { format!("{base}/{target}") }
    }
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: HttpConfig,
}

impl ReqwestTransport {
    /// Build a transport for `config`.
    ///
    /// # Errors
    ///
    /// - `TransportError::Network` if the TLS backend cannot be initialized
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Settings in use.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.config.resolve(&request.url);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| TransportError::Network(e.to_string()))?;

        tracing::debug!(method = request.method.as_str(), %url, status, "http request completed");
        Ok(HttpResponse { status, body: body.to_vec() })
    }
}
