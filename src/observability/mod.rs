//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Client calls produce:
//!     → tracing events (attempts, retries, terminal failures)
//!     → metrics.rs (counters, histograms)
//!
//! Binaries install:
//!     → logging.rs (subscriber with env filter)
//! ```

pub mod logging;
pub mod metrics;
