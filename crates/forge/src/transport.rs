//! HTTP transport
//!
//! [`Transport`] is the single seam between the forge substrate and the
//! network: one request in, one response out. It performs no retries and
//! does not interpret status codes; mapping statuses to errors is the
//! substrate's job.
//!
//! [`UreqTransport`] is the production implementation. `ureq` is blocking,
//! so each request runs on `tokio::task::spawn_blocking`.

use async_trait::async_trait;
use repotable_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Default global timeout for one request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// One outgoing request
#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    /// Method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Header name/value pairs
    pub headers: Vec<(String, String)>,
    /// JSON body, if any
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Request without headers or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        HttpRequest {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a JSON body
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Header value by case-insensitive name
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// Credentials travel in headers; keep them out of logs.
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &names)
            .field("body", &self.body.is_some())
            .finish()
    }
}

/// One response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Body text
    pub body: String,
}

impl HttpResponse {
    /// Build a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        HttpResponse {
            status,
            body: body.into(),
        }
    }

    /// True for 2xx statuses
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body text
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| Error::Transport {
            status: Some(self.status),
            reason: format!("unexpected response body: {}", e),
        })
    }
}

/// Sends one HTTP request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return whatever status came back. Errors only
    /// when no response arrived.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

// =============================================================================
// ureq implementation
// =============================================================================

/// Transport backed by a `ureq` agent
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl UreqTransport {
    /// Agent with a global per-request timeout
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        UreqTransport {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn send_blocking(agent: &ureq::Agent, request: &HttpRequest) -> Result<HttpResponse> {
        let body = match &request.body {
            Some(body) => Some(serde_json::to_vec(body)?),
            None => None,
        };
        let url = request.url.as_str();
        let headers = request.headers.as_slice();

        let result = match (request.method, body) {
            (Method::Get, _) => with_headers(agent.get(url), headers).call(),
            (Method::Delete, None) => with_headers(agent.delete(url), headers).call(),
            (Method::Delete, Some(body)) => with_headers(agent.delete(url), headers)
                .header("Content-Type", "application/json")
                .force_send_body()
                .send(&body[..]),
            (Method::Post, body) => with_headers(agent.post(url), headers)
                .header("Content-Type", "application/json")
                .send(body.as_deref().unwrap_or_default()),
            (Method::Put, body) => with_headers(agent.put(url), headers)
                .header("Content-Type", "application/json")
                .send(body.as_deref().unwrap_or_default()),
        };

        let mut response = result.map_err(|e| Error::Transport {
            status: None,
            reason: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::Transport {
                status: Some(status),
                reason: format!("failed to read response: {}", e),
            })?;
        Ok(HttpResponse { status, body })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let agent = self.agent.clone();
        let method = request.method;
        let url = request.url.clone();
        let response = tokio::task::spawn_blocking(move || Self::send_blocking(&agent, &request))
            .await
            .map_err(|e| Error::Internal {
                reason: format!("transport task failed: {}", e),
            })??;
        debug!(target: "repotable::forge", %method, %url, status = response.status, "response");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::new(Method::Put, "https://example.com/x")
            .header("Authorization", "Bearer secret")
            .json(json!({"a": 1}));
        assert_eq!(request.header_value("authorization"), Some("Bearer secret"));
        assert_eq!(request.body, Some(json!({"a": 1})));
    }

    #[test]
    fn test_request_debug_hides_header_values() {
        let request = HttpRequest::new(Method::Get, "https://example.com/x")
            .header("Authorization", "Bearer secret");
        let debug = format!("{:?}", request);
        assert!(debug.contains("Authorization"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse::new(201, r#"{"sha": "abc"}"#);
        assert!(response.ok());
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["sha"], "abc");
        assert!(!HttpResponse::new(404, "").ok());

        let err = HttpResponse::new(200, "<html>").json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, Error::Transport { status: Some(200), .. }));
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }
}
