//! Common interface over the two pending-anchor stores.
//!
//! The page-side [`QueueStore`] and the coordinator's [`Outbox`] backends live
//! in separate storage namespaces and are never synchronized. Code that only
//! needs to hand an anchor over, or count what is still waiting, works against
//! [`AnchorQueue`] and does not care which context it runs in.

use s4_core::{Environment, QueueItem, pending_items};

use crate::{
    error::StorageError,
    outbox::{MemoryOutbox, Outbox, RedbOutbox},
    queue::QueueStore,
    storage::Storage,
};

/// A durable queue of anchors waiting for delivery.
pub trait AnchorQueue: Send + Sync {
    /// Queue `item` for delivery.
    fn enqueue(&self, item: QueueItem) -> Result<(), StorageError>;

    /// Items not yet delivered, in queue order.
    fn pending(&self) -> Result<Vec<QueueItem>, StorageError>;

    /// Number of items not yet delivered.
    fn pending_count(&self) -> Result<usize, StorageError> {
        Ok(self.pending()?.len())
    }
}

impl<S: Storage, E: Environment> AnchorQueue for QueueStore<S, E> {
    fn enqueue(&self, item: QueueItem) -> Result<(), StorageError> {
        self.append(item).map(|_| ())
    }

    fn pending(&self) -> Result<Vec<QueueItem>, StorageError> {
        Ok(pending_items(&self.load_queue()))
    }
}

fn outbox_pending(outbox: &impl Outbox) -> Result<Vec<QueueItem>, StorageError> {
    Ok(outbox.entries()?.into_iter().map(|entry| entry.item).filter(QueueItem::is_pending).collect())
}

impl AnchorQueue for MemoryOutbox {
    fn enqueue(&self, item: QueueItem) -> Result<(), StorageError> {
        self.push(&item).map(|_| ())
    }

    fn pending(&self) -> Result<Vec<QueueItem>, StorageError> {
        outbox_pending(self)
    }
}

impl AnchorQueue for RedbOutbox {
    fn enqueue(&self, item: QueueItem) -> Result<(), StorageError> {
        self.push(&item).map(|_| ())
    }

    fn pending(&self) -> Result<Vec<QueueItem>, StorageError> {
        outbox_pending(self)
    }
}
