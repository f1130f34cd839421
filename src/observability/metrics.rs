//! Request metrics.
//!
//! # Metrics
//! - `fetchwizard_attempts_total` (counter): attempts that got a response, by method and status
//! - `fetchwizard_retries_total` (counter): re-issued attempts, by method
//! - `fetchwizard_failures_total` (counter): terminal failures, by method and kind
//! - `fetchwizard_request_duration_seconds` (histogram): whole-call latency including retries
//!
//! Nothing is exported unless the embedding application installs a recorder.

use std::time::Instant;

use reqwest::Method;

pub fn record_attempt(method: &Method, status: u16) {
    ::metrics::counter!(
        "fetchwizard_attempts_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_retry(method: &Method) {
    ::metrics::counter!("fetchwizard_retries_total", "method" => method.to_string()).increment(1);
}

pub fn record_failure(method: &Method, kind: &'static str) {
    ::metrics::counter!(
        "fetchwizard_failures_total",
        "method" => method.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_duration(method: &Method, start: Instant) {
    ::metrics::histogram!(
        "fetchwizard_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}
