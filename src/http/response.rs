//! Response coercion.
//!
//! # Responsibilities
//! - Map a requested [`ResponseType`] (or the response's content-type) to a
//!   parsing strategy
//! - Apply a caller-supplied parser in place of the default strategies
//! - Extract a best-effort payload from error responses

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::http::error::BoxError;
use crate::http::fetch::RawResponse;

/// Caller-supplied parser. Receives the raw body text and replaces every
/// default coercion.
pub type ResponseParser = Arc<dyn Fn(&str) -> Result<Value, BoxError> + Send + Sync>;

/// How the response body should be coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseType {
    Json,
    Text,
    Blob,
    ArrayBuffer,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown response type {0:?} (expected json, text, blob or arrayBuffer)")]
pub struct UnknownResponseType(pub String);

impl FromStr for ResponseType {
    type Err = UnknownResponseType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ResponseType::Json),
            "text" => Ok(ResponseType::Text),
            "blob" => Ok(ResponseType::Blob),
            "arrayBuffer" | "array-buffer" | "array_buffer" => Ok(ResponseType::ArrayBuffer),
            other => Err(UnknownResponseType(other.to_string())),
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseType::Json => "json",
            ResponseType::Text => "text",
            ResponseType::Blob => "blob",
            ResponseType::ArrayBuffer => "arrayBuffer",
        };
        f.write_str(name)
    }
}

/// Binary body tagged with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    content_type: Option<String>,
    bytes: Bytes,
}

impl Blob {
    pub fn new(content_type: Option<String>, bytes: Bytes) -> Self {
        Self { content_type, bytes }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A coerced response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Json(Value),
    Text(String),
    Blob(Blob),
    ArrayBuffer(Bytes),
    /// No body (204, 205, 304, HEAD, or an empty JSON body).
    Empty,
}

impl ParsedResponse {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ParsedResponse::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParsedResponse::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Raw bytes for the binary variants.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ParsedResponse::Blob(blob) => Some(blob.bytes()),
            ParsedResponse::ArrayBuffer(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ParsedResponse::Empty)
    }

    /// Deserialize the body into `T`, whatever variant it was coerced to.
    pub fn deserialize<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        match self {
            ParsedResponse::Json(value) => serde_json::from_value(value),
            ParsedResponse::Text(text) => serde_json::from_str(&text),
            ParsedResponse::Blob(blob) => serde_json::from_slice(blob.bytes()),
            ParsedResponse::ArrayBuffer(bytes) => serde_json::from_slice(&bytes),
            ParsedResponse::Empty => serde_json::from_value(Value::Null),
        }
    }
}

/// Pick a response type from a `Content-Type` header value.
///
/// A missing header is treated as JSON; JSON coercion falls back to text when
/// the body does not parse.
pub fn detect_response_type(content_type: Option<&str>) -> ResponseType {
    let Some(content_type) = content_type else {
        return ResponseType::Json;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if essence.is_empty() || essence == "application/json" || essence.ends_with("+json") {
        return ResponseType::Json;
    }
    if essence.starts_with("text/")
        || matches!(
            essence.as_str(),
            "image/svg" | "image/svg+xml" | "application/xml" | "application/xhtml" | "application/xhtml+xml" | "application/html"
        )
    {
        return ResponseType::Text;
    }
    ResponseType::Blob
}

fn has_no_body(response: &RawResponse, method: &Method) -> bool {
    *method == Method::HEAD
        || matches!(
            response.status(),
            StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT | StatusCode::NOT_MODIFIED
        )
}

/// Coerce a successful response body.
pub(crate) fn coerce(
    response: &RawResponse,
    method: &Method,
    response_type: Option<ResponseType>,
    parser: Option<&ResponseParser>,
) -> Result<ParsedResponse, BoxError> {
    if has_no_body(response, method) {
        return Ok(ParsedResponse::Empty);
    }
    if let Some(parser) = parser {
        return (parser.as_ref())(&response.text()).map(ParsedResponse::Json);
    }

    match response_type {
        Some(ResponseType::Json) => {
            if response.is_empty() {
                return Ok(ParsedResponse::Empty);
            }
            Ok(ParsedResponse::Json(response.json()?))
        }
        Some(ResponseType::Text) => Ok(ParsedResponse::Text(response.text())),
        Some(ResponseType::Blob) => Ok(ParsedResponse::Blob(Blob::new(
            response.content_type().map(str::to_string),
            response.bytes(),
        ))),
        Some(ResponseType::ArrayBuffer) => Ok(ParsedResponse::ArrayBuffer(response.bytes())),
        None => match detect_response_type(response.content_type()) {
            ResponseType::Json if response.is_empty() => Ok(ParsedResponse::Empty),
            ResponseType::Json => Ok(match response.json::<Value>() {
                Ok(value) => ParsedResponse::Json(value),
                Err(_) => ParsedResponse::Text(response.text()),
            }),
            detected => coerce(response, method, Some(detected), None),
        },
    }
}

/// Best-effort payload of an error response: JSON when it parses, the raw
/// text otherwise, nothing for an empty body.
pub(crate) fn error_payload(response: &RawResponse) -> Option<Value> {
    if response.is_empty() {
        return None;
    }
    Some(
        response
            .json::<Value>()
            .unwrap_or_else(|_| Value::String(response.text())),
    )
}
