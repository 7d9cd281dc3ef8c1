//! Batch sync state machine.
//!
//! Decides what the sync engine does next: send a batch, wait and retry, or
//! stop with a report. Uses the action pattern: the driver feeds in what it
//! observed (pending count, connectivity, the outcome of the POST) and
//! executes the returned [`SyncAction`]. No I/O and no clock access happen
//! here, so retry bounds are testable without a network.
//!
//! # State Machine
//!
//! ```text
//!            check            pending > 0 && online
//! ┌──────┐ ───────> ┌──────────┐ ─────────────────> ┌─────────┐
//! │ Idle │          │ Checking │                    │ Sending │
//! └──────┘ <─────── └──────────┘                    └─────────┘
//!    ▲    empty / offline  ▲                          │      │
//!    │                     │ check                    │      │ failure,
//!    │                ┌─────────────┐   failure,      │      │ attempt >= max
//!    │                │ BackoffWait │ <───────────────┘      │
//!    │                └─────────────┘  attempt < max         │
//!    └────────────────────── success / exhausted ────────────┘
//! ```

use std::time::Duration;

use crate::{backoff::BackoffPolicy, error::SyncError};

/// Phase of the sync state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No sync in progress
    Idle,
    /// Inspecting the queue and connectivity
    Checking,
    /// Batch POST in flight
    Sending,
    /// Waiting out a backoff delay before the next check
    BackoffWait,
}

/// Severity of a user-visible status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    /// Progress or success
    Info,
    /// Deferred or retrying
    Warn,
    /// Terminal failure, needs manual retry
    Error,
}

/// Terminal result of one `sync_with_backoff` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
    /// Nothing unsynced in the queue
    NothingPending,
    /// Device offline; nothing attempted and no retry consumed
    Offline {
        /// Items still waiting
        pending: usize,
    },
    /// Server confirmed the batch
    Synced {
        /// Items marked synced
        count: usize,
    },
    /// Every retry failed; the user must trigger sync again
    Exhausted {
        /// Total attempts made (initial + retries)
        attempts: u32,
        /// Items still waiting
        pending: usize,
    },
}

impl SyncReport {
    /// Severity for display.
    pub fn level(&self) -> StatusLevel {
        match self {
            Self::NothingPending | Self::Synced { .. } => StatusLevel::Info,
            Self::Offline { .. } => StatusLevel::Warn,
            Self::Exhausted { .. } => StatusLevel::Error,
        }
    }

    /// Human-readable status line.
    pub fn message(&self) -> String {
        match self {
            Self::NothingPending => "No pending anchors to sync".to_string(),
            Self::Offline { pending } => {
                format!("Still offline - {pending} anchor(s) will sync when connectivity returns")
            },
            Self::Synced { count } => format!("Synced {count} anchor(s) to the ledger"),
            Self::Exhausted { attempts, pending } => format!(
                "Sync failed after {attempts} attempts - {pending} anchor(s) still queued, retry manually"
            ),
        }
    }

    /// Whether the run ended without an error.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::NothingPending | Self::Synced { .. })
    }
}

/// Actions returned by the sync state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// POST all pending items as one batch
    SendBatch {
        /// Attempt number (0 = first try)
        attempt: u32,
        /// Items in the batch
        count: usize,
    },
    /// Sleep for `delay`, then check again as `attempt`
    ScheduleRetry {
        /// Attempt number of the upcoming retry
        attempt: u32,
        /// Backoff delay including jitter
        delay: Duration,
    },
    /// Stop and surface this report
    Finish(SyncReport),
}

/// Sync state machine.
///
/// Owns the retry counter so the driver never tracks attempts itself. One
/// instance per execution context.
#[derive(Debug, Clone)]
pub struct SyncMachine {
    policy: BackoffPolicy,
    phase: SyncPhase,
    attempt: u32,
    pending: usize,
}

impl SyncMachine {
    /// Idle machine using `policy`.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, phase: SyncPhase::Idle, attempt: 0, pending: 0 }
    }

    /// Current phase.
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Attempt the next send will be.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Backoff policy in use.
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Start (from `Idle`) or resume (from `BackoffWait`) a sync run.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if a batch is already in flight
    pub fn check(&mut self, pending: usize, online: bool) -> Result<SyncAction, SyncError> {
        if !matches!(self.phase, SyncPhase::Idle | SyncPhase::BackoffWait) {
            return Err(SyncError::InvalidState { phase: self.phase, operation: "check" });
        }
        self.phase = SyncPhase::Checking;
        self.pending = pending;

        if pending == 0 {
            self.reset();
            return Ok(SyncAction::Finish(SyncReport::NothingPending));
        }

        if !online {
            // Ends the chain; the next trigger starts with the full budget.
            self.reset();
            return Ok(SyncAction::Finish(SyncReport::Offline { pending }));
        }

        self.phase = SyncPhase::Sending;
        Ok(SyncAction::SendBatch { attempt: self.attempt, count: pending })
    }

    /// The batch POST succeeded and `count` items were marked synced.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if no batch was in flight
    pub fn handle_success(&mut self, count: usize) -> Result<SyncAction, SyncError> {
        if self.phase != SyncPhase::Sending {
            return Err(SyncError::InvalidState { phase: self.phase, operation: "handle_success" });
        }
        self.reset();
        Ok(SyncAction::Finish(SyncReport::Synced { count }))
    }

    /// The batch POST failed (non-2xx or network error).
    ///
    /// `random` supplies the jitter; see [`BackoffPolicy::delay`].
    ///
    /// # Errors
    ///
    /// - `InvalidState` if no batch was in flight
    pub fn handle_failure(&mut self, random: u64) -> Result<SyncAction, SyncError> {
        if self.phase != SyncPhase::Sending {
            return Err(SyncError::InvalidState { phase: self.phase, operation: "handle_failure" });
        }

        let failed = self.attempt;
        if self.policy.should_retry(failed) {
            let delay = self.policy.delay(failed, random);
            self.attempt = failed + 1;
            self.phase = SyncPhase::BackoffWait;
            return Ok(SyncAction::ScheduleRetry { attempt: self.attempt, delay });
        }

        let pending = self.pending;
        self.reset();
        Ok(SyncAction::Finish(SyncReport::Exhausted { attempts: failed + 1, pending }))
    }

    /// Return to `Idle` with a zeroed retry counter.
    pub fn reset(&mut self) {
        self.phase = SyncPhase::Idle;
        self.attempt = 0;
        self.pending = 0;
    }
}

impl Default for SyncMachine {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}
