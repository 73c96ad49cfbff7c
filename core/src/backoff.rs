//! Exponential backoff between attempts.

use std::time::Duration;

pub const BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Delay before retry number `retry` (1-indexed): `2^retry * 100ms`.
pub fn backoff_delay(retry: u32) -> Duration {
    let factor = 2u32.saturating_pow(retry);
    BACKOFF_BASE.saturating_mul(factor)
}
