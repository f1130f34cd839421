//! HTTP request helper over a pluggable fetch backend.
//!
//! Adds body serialization, response coercion, base URL joining, retries
//! and normalized errors on top of a single `fetch` capability.

pub mod config;
pub mod http;
pub mod observability;
pub mod resilience;

pub use config::FetchConfig;
pub use http::{Client, FetchError, FetchOptions, ParsedResponse, ResponseType};
