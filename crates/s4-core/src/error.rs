//! Error types for the sync state machine.

use thiserror::Error;

use crate::sync::SyncPhase;

/// Errors from driving [`crate::SyncMachine`] out of order.
///
/// These indicate a driver bug, never a network or storage condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Invalid state transition attempted
    #[error("invalid state transition: cannot {operation} from {phase:?}")]
    InvalidState {
        /// Phase when the error occurred
        phase: SyncPhase,
        /// Operation that was attempted
        operation: &'static str,
    },
}
