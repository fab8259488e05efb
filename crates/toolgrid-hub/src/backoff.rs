//! Reconnect backoff arithmetic.

use std::time::Duration;

/// Base delay before the first reconnect attempt (doubles each retry).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on the delay between reconnect attempts.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Backoff parameters for reconnect scheduling.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Delay before the first reconnect attempt.
    pub base: Duration,
    /// Upper bound on any reconnect delay.
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_DELAY,
            cap: DEFAULT_MAX_DELAY,
        }
    }
}

impl BackoffPolicy {
    /// Delay for the reconnect attempt following `retry_count` failures.
    #[must_use]
    pub fn delay(&self, retry_count: u32) -> Duration {
        reconnect_delay(self.base, retry_count, self.cap)
    }
}

/// Delay before the reconnect attempt following `retry_count` failures.
///
/// `base * 2^(retry_count - 1)`, saturating, capped at `cap`. The first
/// retry (`retry_count == 1`) waits exactly `base`.
#[must_use]
pub fn reconnect_delay(base: Duration, retry_count: u32, cap: Duration) -> Duration {
    let exponent = retry_count.saturating_sub(1).min(32);
    let delay = base.saturating_mul(2u32.saturating_pow(exponent));
    delay.min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_per_retry() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(30);
        assert_eq!(reconnect_delay(base, 1, cap), Duration::from_secs(1));
        assert_eq!(reconnect_delay(base, 2, cap), Duration::from_secs(2));
        assert_eq!(reconnect_delay(base, 3, cap), Duration::from_secs(4));
        assert_eq!(reconnect_delay(base, 4, cap), Duration::from_secs(8));
    }

    #[test]
    fn test_capped() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(30);
        assert_eq!(reconnect_delay(base, 6, cap), Duration::from_secs(30));
        assert_eq!(reconnect_delay(base, 10, cap), Duration::from_secs(30));
    }

    #[test]
    fn test_large_retry_count_saturates() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(30);
        // Would overflow 2^n without saturation
        assert_eq!(reconnect_delay(base, 200, cap), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_retry_count_uses_base() {
        let base = Duration::from_millis(250);
        let cap = Duration::from_secs(30);
        assert_eq!(reconnect_delay(base, 0, cap), base);
    }
}
