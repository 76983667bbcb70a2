//! Bounded exponential backoff for status polling.

use std::time::Duration;

/// Retry policy applied to a single status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
}

impl BackoffPolicy {
    /// Default delay before the first retry.
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);
    /// Default ceiling on a single delay.
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
    /// Default number of attempts per poll.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    /// Creates a policy. An attempt ceiling of zero is raised to one.
    #[must_use]
    pub const fn new(initial_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
        }
    }

    /// Returns the number of attempts allowed per poll.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay to wait after the `failed_attempt`-th failure
    /// (one-based): `initial * 2^(n-1)`, capped at the maximum delay.
    #[must_use]
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1);
        let factor = 1_u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_INITIAL_DELAY,
            Self::DEFAULT_MAX_DELAY,
            Self::DEFAULT_MAX_ATTEMPTS,
        )
    }
}
