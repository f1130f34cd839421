//! Per-call request options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::http::body::RequestBody;
use crate::http::error::BoxError;
use crate::http::headers::HeaderInit;
use crate::http::response::{ResponseParser, ResponseType};

/// Options for one call. Unset fields fall back to the client's defaults.
#[derive(Clone, Default)]
pub struct FetchOptions {
    pub method: Option<Method>,
    pub headers: Option<HeaderInit>,
    pub body: Option<RequestBody>,
    pub base_url: Option<String>,
    pub query: Vec<(String, String)>,
    pub response_type: Option<ResponseType>,
    pub parse_response: Option<ResponseParser>,
    /// Re-issues allowed after the first attempt.
    pub retry: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub retry_status_codes: Option<Vec<StatusCode>>,
    /// Per-attempt timeout. Zero disables the client's default.
    pub timeout: Option<Duration>,
    pub signal: Option<CancellationToken>,
    /// Coerce and return non-2xx responses instead of failing.
    pub ignore_response_error: bool,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn headers(mut self, headers: impl Into<HeaderInit>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn parse_response<F>(mut self, parser: F) -> Self
    where
        F: Fn(&str) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.parse_response = Some(Arc::new(parser));
        self
    }

    pub fn retry(mut self, retries: u32) -> Self {
        self.retry = Some(retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn retry_status_codes(mut self, codes: impl IntoIterator<Item = StatusCode>) -> Self {
        self.retry_status_codes = Some(codes.into_iter().collect());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn ignore_response_error(mut self, ignore: bool) -> Self {
        self.ignore_response_error = ignore;
        self
    }
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("base_url", &self.base_url)
            .field("query", &self.query)
            .field("response_type", &self.response_type)
            .field("parse_response", &self.parse_response.is_some())
            .field("retry", &self.retry)
            .field("retry_delay", &self.retry_delay)
            .field("retry_status_codes", &self.retry_status_codes)
            .field("timeout", &self.timeout)
            .field("signal", &self.signal)
            .field("ignore_response_error", &self.ignore_response_error)
            .finish()
    }
}
