//! HTTP request/response model and the transport seam.
//!
//! The interceptor and the sync engine speak in [`HttpRequest`] and
//! [`HttpResponse`] values and reach the network only through a
//! [`Transport`]. Production uses [`ReqwestTransport`](crate::ReqwestTransport);
//! tests script responses with the harness's simulated server.

use std::future::Future;

use s4_core::offline::request_path;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// HTTP method. Only the verbs the subsystem issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

impl Method {
    /// Upper-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Path (`/api/anchor`) or absolute URL
    pub url: String,
    /// Extra headers, in order
    pub headers: Vec<(String, String)>,
    /// Raw body, if any
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// GET `url` with no body.
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: Method::Get, url: url.into(), headers: Vec::new(), body: None }
    }

    /// POST `url` with a raw body.
    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self { method: Method::Post, url: url.into(), headers: Vec::new(), body: Some(body.into()) }
    }

    /// POST `url` with a JSON body and matching content type.
    pub fn post_json(url: impl Into<String>, body: &Value) -> Self {
        Self::post(url, body.to_string()).with_header("content-type", "application/json")
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Path component of the target, without query or fragment.
    pub fn path(&self) -> &str {
        request_path(&self.url)
    }

    /// Body parsed as JSON, if present and valid.
    pub fn json_body(&self) -> Option<Value> {
        self.body.as_deref().and_then(|body| serde_json::from_slice(body).ok())
    }
}

/// Response as seen by the caller. Any status, not only 2xx.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Response with `status` and an empty body.
    pub fn new(status: u16) -> Self {
        Self { status, body: Vec::new() }
    }

    /// Response with `status` and a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self { status, body: body.to_string().into_bytes() }
    }

    /// 200 with a JSON body.
    pub fn ok_json(body: &Value) -> Self {
        Self::json(200, body)
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON into `T`.
    ///
    /// # Errors
    ///
    /// - `TransportError::Decode` if the body is not valid JSON for `T`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Turn a non-2xx response into `TransportError::Status`.
    ///
    /// # Errors
    ///
    /// - `TransportError::Status` if the status is not 2xx
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.is_success() { Ok(self) } else { Err(TransportError::Status { status: self.status }) }
    }
}

/// Delivery failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Request never produced a response (DNS, refused, reset, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-2xx status
    #[error("server returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Response body did not have the expected shape
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether retrying the same request might succeed.
    ///
    /// Network errors, 5xx and 429 are transient. Other statuses and decode
    /// errors are not. The sync engine retries every failure under its
    /// backoff budget regardless; this is for callers that want to tell the
    /// two apart in logs or UI.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status } => *status >= 500 || *status == 429,
            Self::Decode(_) => false,
        }
    }
}

/// The platform's outbound-request primitive.
///
/// Returns `Ok` for any HTTP status; `Err` only when no response arrived.
/// Clone is expected to be cheap (shared connection pool or Arc).
pub trait Transport: Clone + Send + Sync + 'static {
    /// Send `request` and wait for the response.
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn path_strips_origin_and_query() {
        let request = HttpRequest::get("https://s4ledger.example/api/offline/queue?x=1");
        assert_eq!(request.path(), "/api/offline/queue");
    }

    #[test]
    fn post_json_sets_content_type() {
        let request = HttpRequest::post_json("/api/anchor", &json!({"hash": "abc"}));
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.headers, vec![("content-type".into(), "application/json".into())]);
        assert_eq!(request.json_body(), Some(json!({"hash": "abc"})));
    }

    #[test]
    fn error_for_status_keeps_success() {
        assert!(HttpResponse::new(204).error_for_status().is_ok());
        assert_eq!(
            HttpResponse::new(503).error_for_status(),
            Err(TransportError::Status { status: 503 })
        );
    }

    #[test]
    fn transient_classification() {
        assert!(TransportError::Network("refused".into()).is_transient());
        assert!(TransportError::Status { status: 502 }.is_transient());
        assert!(TransportError::Status { status: 429 }.is_transient());
        assert!(!TransportError::Status { status: 400 }.is_transient());
        assert!(!TransportError::Decode("eof".into()).is_transient());
    }

    #[test]
    fn decode_reads_json_body() {
        let response = HttpResponse::ok_json(&json!({"synced": 3}));
        let value: Value = response.decode().unwrap();
        assert_eq!(value["synced"], 3);
        assert!(matches!(HttpResponse::new(200).decode::<Value>(), Err(TransportError::Decode(_))));
    }
}
