//! HTTP transport used by the cached client
//!
//! The client talks to the network only through [`Transport`], so tests can
//! script responses and count calls without a live server.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

/// A GET request: absolute URL plus query pairs
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

/// The parts of a response the client inspects
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// `Content-Type` header value, if any
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    /// A 200 response with a JSON body
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: body.into(),
        }
    }

    /// An empty response with the given status
    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the content type is `application/json` or a `+json` variant
    pub fn is_json(&self) -> bool {
        let Some(content_type) = self.content_type.as_deref() else {
            return false;
        };
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        mime == "application/json" || mime.ends_with("+json")
    }
}

/// Transport-level failure (DNS, connect, timeout, body read)
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError(e.to_string())
    }
}

/// Sends GET requests
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Creates a transport whose requests time out after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Creates a transport with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(&request.url)
            .query(&request.query)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_json_accepts_parameters_and_suffixes() {
        let mut response = HttpResponse::json("{}");
        assert!(response.is_json());

        response.content_type = Some("application/json; charset=UTF-8".into());
        assert!(response.is_json());

        response.content_type = Some("application/problem+json".into());
        assert!(response.is_json());

        response.content_type = Some("text/html".into());
        assert!(!response.is_json());

        response.content_type = None;
        assert!(!response.is_json());
    }

    #[test]
    fn test_is_success_range() {
        assert!(HttpResponse::status(200).is_success());
        assert!(HttpResponse::status(204).is_success());
        assert!(!HttpResponse::status(302).is_success());
        assert!(!HttpResponse::status(429).is_success());
        assert!(!HttpResponse::status(500).is_success());
    }
}
