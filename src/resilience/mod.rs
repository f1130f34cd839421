//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Each attempt:
//!     → timeouts.rs (race against cancellation and the per-attempt timeout)
//!     → On failure: retries.rs (check budget and retryability)
//!     → backoff.rs (delay before the next attempt, cancellable)
//! ```

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::RetryPolicy;
