//! Normalized fetch errors.
//!
//! Every terminal failure of a call, whatever its origin, is surfaced as a
//! single [`FetchError`] carrying the resolved request URL, the method, the
//! response (when one was received) and the payload parsed from its body.

use std::fmt;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::http::fetch::{RawResponse, TransportError};

/// Boxed error used for pluggable parsers and transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why an attempt was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The caller's cancellation token fired.
    Cancelled,
    /// The per-attempt timeout elapsed.
    Timeout,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Cancelled => f.write_str("This operation was aborted"),
            AbortReason::Timeout => f.write_str("The operation timed out and was aborted"),
        }
    }
}

/// The kind of failure behind a [`FetchError`].
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The fetch invocation itself failed (connection refused, DNS, reset).
    #[error("network error: {0}")]
    Network(#[source] TransportError),

    /// Cancellation or timeout.
    #[error("{0}")]
    Abort(AbortReason),

    /// The server answered with a non-2xx status.
    #[error("request failed with status {0}")]
    Http(StatusCode),

    /// The response body could not be coerced to the requested type.
    #[error("failed to parse response: {0}")]
    Parse(#[source] BoxError),

    /// The request could not be built (bad URL, header or body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ErrorKind {
    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Network(_) => "network",
            ErrorKind::Abort(AbortReason::Cancelled) => "aborted",
            ErrorKind::Abort(AbortReason::Timeout) => "timeout",
            ErrorKind::Http(_) => "http",
            ErrorKind::Parse(_) => "parse",
            ErrorKind::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// Error returned by every [`Client`](crate::http::Client) call.
#[derive(Debug)]
pub struct FetchError {
    request: String,
    method: Method,
    kind: ErrorKind,
    response: Option<RawResponse>,
    data: Option<Value>,
}

impl FetchError {
    pub(crate) fn new(request: impl Into<String>, method: Method, kind: ErrorKind) -> Self {
        Self {
            request: request.into(),
            method,
            kind,
            response: None,
            data: None,
        }
    }

    pub(crate) fn with_response(mut self, response: RawResponse, data: Option<Value>) -> Self {
        self.response = Some(response);
        self.data = data;
        self
    }

    /// The resolved URL of the failed request.
    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The response received from the server, if any.
    pub fn response(&self) -> Option<&RawResponse> {
        self.response.as_ref()
    }

    /// Error payload parsed from the response body (JSON, or the raw text as
    /// a JSON string when the body is not JSON).
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(RawResponse::status)
    }

    pub fn status_text(&self) -> Option<&str> {
        self.response.as_ref().map(RawResponse::status_text)
    }

    pub fn is_abort(&self) -> bool {
        matches!(self.kind, ErrorKind::Abort(AbortReason::Cancelled))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Abort(AbortReason::Timeout))
    }

    pub fn is_network(&self) -> bool {
        matches!(self.kind, ErrorKind::Network(_))
    }

    pub fn is_http(&self) -> bool {
        matches!(self.kind, ErrorKind::Http(_))
    }

    pub fn is_parse(&self) -> bool {
        matches!(self.kind, ErrorKind::Parse(_))
    }

    /// Message a server put in its error payload, if any.
    fn payload_message(&self) -> Option<&str> {
        let data = self.data.as_ref()?;
        match data {
            Value::String(text) if !text.is_empty() => Some(text.as_str()),
            Value::Object(map) => ["message", "statusMessage", "error"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str)),
            _ => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:?}: ", self.method, self.request)?;
        match &self.response {
            Some(response) => {
                write!(f, "{} {}", response.status().as_u16(), response.status_text())?;
                match (&self.kind, self.payload_message()) {
                    (ErrorKind::Http(_), Some(message)) => write!(f, " {}", message),
                    (ErrorKind::Http(_), None) => Ok(()),
                    (kind, _) => write!(f, " {}", kind),
                }
            }
            None => write!(f, "<no response> {}", self.kind),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
