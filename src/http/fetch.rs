//! The fetch capability consumed by the client.
//!
//! # Responsibilities
//! - Define the single operation the client needs from a transport
//! - Carry raw request/response data between the client and the transport
//! - Provide a default transport backed by `reqwest`
//!
//! # Design Decisions
//! - Transports read the whole body before returning; coercion happens later
//! - A transport may watch the request's cancellation token, but the client
//!   also drops the in-flight future when the token fires

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::http::error::BoxError;

/// Failure of the fetch invocation itself.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct TransportError(BoxError);

impl TransportError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self(source.into())
    }

    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self::new(e)
    }
}

/// A fully resolved request as handed to the transport.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Fires when the attempt is cancelled or times out.
    pub signal: CancellationToken,
}

/// A response with its body fully read.
#[derive(Debug, Clone)]
pub struct RawResponse {
    url: String,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl RawResponse {
    pub fn new(url: impl Into<String>, status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            url: url.into(),
            status,
            headers,
            body,
        }
    }

    /// Final URL of the response (after redirects).
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_text(&self) -> &str {
        self.status.canonical_reason().unwrap_or("")
    }

    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// The platform fetch primitive.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: RawRequest) -> Result<RawResponse, TransportError>;
}

/// [`Fetch`] implementation backed by a `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for ReqwestFetch {
    async fn fetch(&self, request: RawRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let url = response.url().to_string();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(RawResponse::new(url, status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_raw_response_accessors() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let response = RawResponse::new(
            "http://localhost/params",
            StatusCode::OK,
            headers,
            Bytes::from_static(br#"{"test":"true"}"#),
        );

        assert!(response.ok());
        assert_eq!(response.status_text(), "OK");
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.text(), r#"{"test":"true"}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["test"], "true");
    }

    #[test]
    fn test_text_is_lossy() {
        let response = RawResponse::new(
            "http://localhost/",
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(&[0x66, 0xff, 0x6f]),
        );
        assert_eq!(response.text(), "f\u{fffd}o");
    }
}
