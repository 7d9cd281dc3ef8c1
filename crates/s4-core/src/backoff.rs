//! Exponential backoff with jitter for batch sync retries.

use std::time::Duration;

/// Delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Retries after the initial attempt before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Upper bound (exclusive) of the random jitter added to each delay.
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(500);

/// Retry schedule: `base_delay * 2^attempt + jitter`, jitter in
/// `[0, max_jitter)`, for attempts `0..max_retries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before retry 0, doubled for each later attempt
    pub base_delay: Duration,
    /// Number of retries allowed after the first attempt
    pub max_retries: u32,
    /// Exclusive bound on jitter
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl BackoffPolicy {
    /// Whether a failure at `attempt` may be retried.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay without jitter before retrying a failure at `attempt`.
    ///
    /// Saturates instead of overflowing for absurd attempt counts.
    pub fn min_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Full delay for a failure at `attempt`.
    ///
    /// `random` is any uniformly random value; it is reduced into
    /// `[0, max_jitter)` at millisecond granularity.
    pub fn delay(&self, attempt: u32, random: u64) -> Duration {
        let jitter_bound = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_bound == 0 { 0 } else { random % jitter_bound };
        self.min_delay(attempt).saturating_add(Duration::from_millis(jitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_delays_double() {
        let policy = BackoffPolicy::default();
        let delays: Vec<u128> = (0..5).map(|k| policy.min_delay(k).as_millis()).collect();
        assert_eq!(delays, [1000, 2000, 4000, 8000, 16000]);
    }

    #[test]
    fn jitter_stays_below_bound() {
        let policy = BackoffPolicy::default();
        for random in [0, 1, 499, 500, 501, u64::MAX] {
            let extra = policy.delay(2, random) - policy.min_delay(2);
            assert!(extra < Duration::from_millis(500), "jitter {extra:?} for {random}");
        }
    }

    #[test]
    fn retry_bound() {
        let policy = BackoffPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(4));
        assert!(!policy.should_retry(5));
    }

    #[test]
    fn zero_jitter_is_exact() {
        let policy = BackoffPolicy { max_jitter: Duration::ZERO, ..BackoffPolicy::default() };
        assert_eq!(policy.delay(3, 12345), Duration::from_millis(8000));
    }

    #[test]
    fn huge_attempt_saturates() {
        let policy = BackoffPolicy::default();
        assert!(policy.min_delay(64) >= policy.min_delay(31));
    }
}
