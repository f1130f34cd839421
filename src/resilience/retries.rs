//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed attempt may be re-issued
//! - Pick the default retry budget for a method
//! - Compute the delay before the next attempt
//!
//! # Design Decisions
//! - Methods with payload semantics (POST/PUT/PATCH/DELETE) get no retries
//!   unless the caller asks for them
//! - Network errors and timeouts are always retryable; HTTP statuses only
//!   when listed
//! - Cancellation is never retried

use std::time::Duration;

use reqwest::{Method, StatusCode};

use crate::http::error::{AbortReason, ErrorKind, FetchError};
use crate::resilience::backoff::calculate_backoff;

/// Default retry budget when neither the call nor the client sets one.
pub fn default_retry_count(method: &Method) -> u32 {
    if is_payload_method(method) {
        0
    } else {
        1
    }
}

fn is_payload_method(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Whether `error` qualifies for another attempt.
pub fn is_retryable(error: &FetchError, status_codes: &[StatusCode]) -> bool {
    match error.kind() {
        ErrorKind::Network(_) => true,
        ErrorKind::Abort(AbortReason::Timeout) => true,
        ErrorKind::Abort(AbortReason::Cancelled) => false,
        ErrorKind::Http(status) => status_codes.contains(status),
        ErrorKind::Parse(_) | ErrorKind::InvalidRequest(_) => false,
    }
}

/// Retry settings for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Re-issues allowed after the first attempt.
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub status_codes: Vec<StatusCode>,
}

impl RetryPolicy {
    /// Whether to re-issue after attempt number `attempt` (1-based) failed.
    pub fn should_retry(&self, attempt: u32, error: &FetchError) -> bool {
        attempt <= self.retries && is_retryable(error, &self.status_codes)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay, self.max_delay)
    }
}
