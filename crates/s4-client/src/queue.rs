//! UI-facing operations on the page-side queue.

use std::sync::Arc;

use s4_core::{Environment, OfflineRoutes, QueueCounts, QueueItem};
use s4_crypto::sha256_hex;
use s4_store::{QueueStore, Storage};
use serde::Deserialize;

use crate::{
    error::ClientError,
    http::{HttpRequest, Transport},
};

/// Result of an explicit "queue this hash" action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// Appended; the queue now holds `len` items
    Queued {
        /// Queue length after the append
        len: usize,
    },
    /// An unsynced item with the same hash was already waiting
    AlreadyQueued,
}

/// Server-side view of the queue from `GET /api/offline/queue`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteQueueStatus {
    /// Items the server holds for this client
    pub queue_size: u64,
    /// Server's last sync time
    pub last_sync: Option<String>,
}

/// Counts for the UI's queue badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSummary {
    /// Local pending / synced counts
    pub counts: QueueCounts,
    /// Local time of the last successful batch sync
    pub last_sync: Option<String>,
    /// Best-effort server status; `None` if the request failed
    pub remote: Option<RemoteQueueStatus>,
}

/// Queue actions exposed to UI code.
pub struct OfflineQueue<T: Transport, S: Storage, E: Environment> {
    queue: Arc<QueueStore<S, E>>,
    transport: T,
    routes: OfflineRoutes,
}

impl<T: Transport, S: Storage, E: Environment> OfflineQueue<T, S, E> {
    /// Actions over `queue`, fetching server status through `transport`.
    pub fn new(queue: Arc<QueueStore<S, E>>, transport: T) -> Self {
        Self { queue, transport, routes: OfflineRoutes::default() }
    }

    /// Use custom route paths.
    #[must_use]
    pub fn with_routes(mut self, routes: OfflineRoutes) -> Self {
        self.routes = routes;
        self
    }

    /// Queue `hash` unless an unsynced item with that hash is waiting.
    ///
    /// # Errors
    ///
    /// - `ClientError::Storage` if the queue could not be saved
    pub fn queue_hash(
        &self,
        hash: &str,
        record_type: &str,
        branch: &str,
    ) -> Result<QueueOutcome, ClientError> {
        let item = QueueItem::new(hash, record_type, branch, self.queue.env().timestamp());

        match self.queue.append_unless_queued(item)? {
            Some(len) => {
                tracing::info!(%hash, record_type, queue_len = len, "hash queued");
                Ok(QueueOutcome::Queued { len })
            },
            None => {
                tracing::debug!(%hash, "hash already queued");
                Ok(QueueOutcome::AlreadyQueued)
            },
        }
    }

    /// Fingerprint `content` with SHA-256 and queue the digest.
    ///
    /// Returns the hex digest along with the outcome.
    ///
    /// # Errors
    ///
    /// - `ClientError::Storage` if the queue could not be saved
    pub fn queue_content(
        &self,
        content: &[u8],
        record_type: &str,
        branch: &str,
    ) -> Result<(String, QueueOutcome), ClientError> {
        let hash = sha256_hex(content);
        let outcome = self.queue_hash(&hash, record_type, branch)?;
        Ok((hash, outcome))
    }

    /// All items in insertion order.
    pub fn items(&self) -> Vec<QueueItem> {
        self.queue.load_queue()
    }

    /// Remove the item at `index`.
    ///
    /// # Errors
    ///
    /// - `ClientError::Storage` if the queue could not be saved
    pub fn remove_item(&self, index: usize) -> Result<Option<QueueItem>, ClientError> {
        Ok(self.queue.remove_item(index)?)
    }

    /// Remove every item.
    ///
    /// # Errors
    ///
    /// - `ClientError::Storage` if the queue could not be saved
    pub fn clear(&self) -> Result<(), ClientError> {
        Ok(self.queue.clear()?)
    }

    /// Remove items the server already confirmed.
    ///
    /// # Errors
    ///
    /// - `ClientError::Storage` if the queue could not be saved
    pub fn remove_synced(&self) -> Result<usize, ClientError> {
        let removed = self.queue.remove_synced()?;
        tracing::debug!(removed, "pruned synced items");
        Ok(removed)
    }

    /// Local counts plus, best-effort, the server's view.
    pub async fn summary(&self) -> QueueSummary {
        let counts = QueueCounts::of(&self.queue.load_queue());
        let last_sync = self.queue.last_sync();
        let remote = self.remote_status().await;
        QueueSummary { counts, last_sync, remote }
    }

    async fn remote_status(&self) -> Option<RemoteQueueStatus> {
        let response = self.transport.send(HttpRequest::get(&self.routes.queue_status)).await.ok()?;
        match response.error_for_status().and_then(|r| r.decode::<RemoteQueueStatus>()) {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::debug!(error = %e, "server queue status unavailable");
                None
            },
        }
    }
}
