//! Timeout and cancellation enforcement.
//!
//! # Responsibilities
//! - Race each attempt against the caller's cancellation token
//! - Derive a per-attempt token that fires when the attempt times out
//! - Make backoff delays cancellable
//!
//! # Design Decisions
//! - Uses Tokio's timer and `tokio_util`'s `CancellationToken`
//! - Caller cancellation is checked first, so it wins over a timeout that
//!   elapses at the same instant
//! - The timeout covers one attempt, not the whole retry sequence

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::http::error::AbortReason;

/// Run one attempt under `signal` and an optional timeout.
///
/// `attempt` receives a child token of `signal` that is cancelled when the
/// timeout elapses, so transports that watch it stop early.
pub async fn with_deadline<T, F, Fut>(
    signal: &CancellationToken,
    timeout: Option<Duration>,
    attempt: F,
) -> Result<T, AbortReason>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = T>,
{
    if signal.is_cancelled() {
        return Err(AbortReason::Cancelled);
    }

    let attempt_signal = signal.child_token();
    let work = attempt(attempt_signal.clone());
    let deadline = async {
        match timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(AbortReason::Cancelled),
        _ = deadline => {
            attempt_signal.cancel();
            Err(AbortReason::Timeout)
        }
        out = work => Ok(out),
    }
}

/// Sleep for `delay` unless `signal` fires first.
pub async fn sleep_or_cancel(delay: Duration, signal: &CancellationToken) -> Result<(), AbortReason> {
    if signal.is_cancelled() {
        return Err(AbortReason::Cancelled);
    }
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(AbortReason::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
