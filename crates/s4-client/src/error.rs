//! Client error types.

use s4_core::SyncError;
use s4_store::StorageError;
use thiserror::Error;

use crate::http::TransportError;

/// Errors surfaced by the offline queue and the sync engine.
///
/// Delivery failures inside a sync run never appear here: the engine turns
/// them into retries and finally a [`SyncReport`](s4_core::SyncReport).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Queue persistence failed
    #[error("queue storage error: {0}")]
    Storage(#[from] StorageError),

    /// Request could not be delivered
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Sync state machine was driven out of order
    #[error("sync state error: {0}")]
    Sync(#[from] SyncError),

    /// The sync service stopped before answering
    #[error("sync service stopped")]
    ServiceStopped,
}
