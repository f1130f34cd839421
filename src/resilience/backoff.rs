//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Delay before retry number `attempt` (1-based).
///
/// `base * 2^(attempt-1)`, capped at `max`, plus up to a tenth of that as
/// jitter. A zero `base` disables waiting entirely.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 || base.is_zero() {
        return Duration::ZERO;
    }

    let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
    let delay = base.checked_mul(factor).map_or(max, |delay| delay.min(max));
    delay + jitter(delay)
}

fn jitter(delay: Duration) -> Duration {
    let spread = delay / 10;
    if spread.is_zero() {
        return Duration::ZERO;
    }
    rand::thread_rng().gen_range(Duration::ZERO..spread)
}
