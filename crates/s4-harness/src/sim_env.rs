//! Simulated environment.
//!
//! Time comes from tokio's clock, so under `#[tokio::test(start_paused =
//! true)]` every sleep completes instantly in virtual time. Randomness comes
//! from a seeded ChaCha RNG. Every requested sleep is recorded so tests can
//! assert on retry schedules.

#![allow(clippy::disallowed_types, reason = "Synchronous bookkeeping, never held across await")]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use s4_core::Environment;

/// Wall-clock time a fresh [`SimEnv`] reports: 2026-01-01T00:00:00Z.
pub const SIM_ORIGIN_SECS: i64 = 1_767_225_600;

/// Deterministic environment for tests. Clones share RNG and sleep log.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
    origin: DateTime<Utc>,
    start: tokio::time::Instant,
}

impl SimEnv {
    /// Environment seeded with 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            sleeps: Arc::new(Mutex::new(Vec::new())),
            origin: DateTime::UNIX_EPOCH + TimeDelta::seconds(SIM_ORIGIN_SECS),
            start: tokio::time::Instant::now(),
        }
    }

    /// Report `origin` as the wall-clock time at construction.
    #[must_use]
    pub fn with_origin(mut self, origin: DateTime<Utc>) -> Self {
        self.origin = origin;
        self
    }

    /// Every sleep requested so far, in order.
    #[allow(clippy::expect_used)]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("sleep log poisoned").clone()
    }

    /// Forget recorded sleeps.
    #[allow(clippy::expect_used)]
    pub fn clear_sleeps(&self) {
        self.sleeps.lock().expect("sleep log poisoned").clear();
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let elapsed = self.now().saturating_duration_since(self.start);
        self.origin + TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::zero())
    }

    #[allow(clippy::expect_used)]
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.sleeps.lock().expect("sleep log poisoned").push(duration);
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().expect("rng poisoned").fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_bytes() {
        let a = SimEnv::with_seed(7);
        let b = SimEnv::with_seed(7);
        assert_eq!(a.random_u64(), b.random_u64());
        assert_ne!(a.random_u64(), SimEnv::with_seed(8).random_u64());
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_advance_virtual_wall_clock() {
        let env = SimEnv::new();
        assert_eq!(env.timestamp(), "2026-01-01T00:00:00.000Z");

        env.sleep(Duration::from_millis(1500)).await;

        assert_eq!(env.timestamp(), "2026-01-01T00:00:01.500Z");
        assert_eq!(env.sleeps(), vec![Duration::from_millis(1500)]);
    }
}
