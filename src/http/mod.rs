//! HTTP request helper.
//!
//! # Data Flow
//! ```text
//! url + FetchOptions
//!     → base_url.rs (join with base, append query)
//!     → headers.rs (normalize & merge)
//!     → body.rs (serialize)
//!     → client.rs (attempt / retry loop)
//!         → fetch.rs (Fetch backend, reqwest by default)
//!     → response.rs (coerce body) | error.rs (FetchError)
//! ```

pub mod base_url;
pub mod body;
pub mod client;
pub mod error;
pub mod fetch;
pub mod headers;
pub mod options;
pub mod response;

pub use body::{FormBody, MultipartForm, RequestBody};
pub use client::{Client, FetchResponse};
pub use error::{AbortReason, BoxError, ErrorKind, FetchError};
pub use fetch::{Fetch, RawRequest, RawResponse, ReqwestFetch, TransportError};
pub use headers::{HeaderInit, InvalidHeader};
pub use options::FetchOptions;
pub use response::{Blob, ParsedResponse, ResponseParser, ResponseType};
