//! Worker error types.

use s4_store::StorageError;
use thiserror::Error;

/// Errors from the background coordinator.
///
/// Per-item delivery failures are not errors: they are logged and the item
/// stays for the next wake.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkerError {
    /// The durable outbox could not be read or written
    #[error("outbox error: {0}")]
    Storage(#[from] StorageError),
}
