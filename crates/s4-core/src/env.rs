//! Environment abstraction for deterministic testing.
//!
//! Decouples queue and sync logic from system resources (time, randomness).
//! Production code runs against the OS clock and RNG; simulations run against
//! a virtual clock and a seeded RNG, so retry schedules and IVs are
//! reproducible.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Abstract environment providing time, randomness, and async sleeping.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
///   (it feeds AES-GCM IVs)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time, used for queue timestamps.
    fn wall_clock(&self) -> DateTime<Utc>;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code (retry scheduling, trigger loops) awaits this; the
    /// state machines never sleep.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// ISO-8601 rendering of [`Self::wall_clock`].
    fn timestamp(&self) -> String {
        iso_timestamp(self.wall_clock())
    }
}

/// Render a wall-clock time as ISO-8601 with millisecond precision and a `Z`
/// suffix, e.g. `2026-10-19T08:30:00.000Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 timestamp written by [`iso_timestamp`] (or any RFC 3339
/// string). `None` if unparseable.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn iso_timestamp_has_millis_and_z() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        assert_eq!(iso_timestamp(at), "2026-10-19T08:30:00.000Z");
    }

    #[test]
    fn parse_inverts_render() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp(&iso_timestamp(at)), Some(at));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
