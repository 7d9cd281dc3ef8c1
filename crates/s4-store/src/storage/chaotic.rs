//! Chaotic storage wrapper for fault injection testing
//!
//! Wraps another storage and fails operations either at random (seeded, so
//! runs are reproducible) or on demand for a specific operation and key. The
//! targeted mode is what lets tests stop a queue save between its plaintext
//! and encrypted phases.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG and fault state")]

use std::sync::{Arc, Mutex};

use super::Storage;
use crate::error::StorageError;

/// Storage operation a [`Fault`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOp {
    /// `get`
    Get,
    /// `set`
    Set,
    /// `remove`
    Remove,
}

/// A targeted failure: the next `times` calls of `op` on `key` fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Operation to fail
    pub op: FaultOp,
    /// Key to fail it on
    pub key: String,
    /// Remaining failures (`usize::MAX` = until cleared)
    pub times: usize,
}

impl Fault {
    /// Fail the next call only.
    pub fn once(op: FaultOp, key: impl Into<String>) -> Self {
        Self { op, key: key.into(), times: 1 }
    }

    /// Fail every call until [`ChaoticStorage::clear_faults`].
    pub fn always(op: FaultOp, key: impl Into<String>) -> Self {
        Self { op, key: key.into(), times: usize::MAX }
    }
}

/// Chaotic storage wrapper that injects failures.
#[derive(Clone)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Targeted faults, checked before the random rate
    faults: Arc<Mutex<Vec<Fault>>>,
    /// Operation counter
    operation_count: Arc<Mutex<usize>>,
}

/// Simple deterministic RNG for chaos injection
///
/// Linear congruential generator: fast and reproducible with the same seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next random value [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }

    fn should_fail(&mut self, failure_rate: f64) -> bool {
        failure_rate > 0.0 && self.next() < failure_rate
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Create a new chaotic storage wrapper
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            faults: Arc::new(Mutex::new(Vec::new())),
            operation_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Wrapper that only fails on targeted faults.
    pub fn targeted(inner: S) -> Self {
        Self::new(inner, 0.0)
    }

    /// Underlying storage (for checking state after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Arm a targeted fault.
    #[allow(clippy::expect_used)]
    pub fn inject(&self, fault: Fault) {
        self.faults.lock().expect("faults mutex poisoned").push(fault);
    }

    /// Disarm all targeted faults.
    #[allow(clippy::expect_used)]
    pub fn clear_faults(&self) {
        self.faults.lock().expect("faults mutex poisoned").clear();
    }

    /// Total number of storage operations attempted.
    #[allow(clippy::expect_used)]
    pub fn operation_count(&self) -> usize {
        *self.operation_count.lock().expect("operation_count mutex poisoned")
    }

    /// Count the operation and decide whether it fails.
    #[allow(clippy::expect_used)]
    fn check(&self, op: FaultOp, key: &str) -> Result<(), StorageError> {
        *self.operation_count.lock().expect("operation_count mutex poisoned") += 1;

        let mut faults = self.faults.lock().expect("faults mutex poisoned");
        if let Some(pos) = faults.iter().position(|f| f.op == op && f.key == key && f.times > 0) {
            let fault = &mut faults[pos];
            if fault.times != usize::MAX {
                fault.times -= 1;
            }
            if fault.times == 0 {
                faults.remove(pos);
            }
            return Err(StorageError::Io(format!("injected {op:?} failure on {key}")));
        }
        drop(faults);

        if self.rng.lock().expect("ChaoticRng mutex poisoned").should_fail(self.failure_rate) {
            return Err(StorageError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check(FaultOp::Get, key)?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check(FaultOp::Set, key)?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check(FaultOp::Remove, key)?;
        self.inner.remove(key)
    }
}
