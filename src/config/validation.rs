//! Checks on a parsed [`FetchConfig`] that TOML syntax cannot express: an
//! absolute base URL, header names and values `reqwest` accepts, real HTTP
//! status codes, a non-zero request timeout, `base_delay_ms <= max_delay_ms`
//! and a known log level. Every problem is reported, not only the first.

use thiserror::Error;

use crate::config::schema::FetchConfig;
use crate::http::base_url::is_absolute;
use crate::http::headers::{normalize_headers, HeaderInit};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("base_url {0:?} is not an absolute URL")]
    BaseUrl(String),

    #[error("header {0}")]
    Header(String),

    #[error("timeouts.request_ms must be greater than zero")]
    ZeroTimeout,

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    DelayOrder { base: u64, max: u64 },

    #[error("retries.status_codes contains invalid status {0}")]
    StatusCode(u16),

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &FetchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(base_url) = &config.base_url {
        if !is_absolute(base_url) {
            errors.push(ValidationError::BaseUrl(base_url.clone()));
        }
    }

    for (name, value) in &config.headers {
        let single = HeaderInit::Pairs(vec![(name.clone(), value.clone())]);
        if let Err(e) = normalize_headers(single) {
            errors.push(ValidationError::Header(e.to_string()));
        }
    }

    if config.timeouts.request_ms == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }

    let retries = &config.retries;
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::DelayOrder {
            base: retries.base_delay_ms,
            max: retries.max_delay_ms,
        });
    }
    for code in &retries.status_codes {
        if !(100..=599).contains(code) {
            errors.push(ValidationError::StatusCode(*code));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
