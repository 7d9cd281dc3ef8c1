//! Durable outbox for the background sync coordinator
//!
//! The coordinator runs in its own execution context and cannot see the
//! page-side [`QueueStore`](crate::QueueStore) namespace. It keeps its own
//! transactional store of pending anchors keyed by an auto-incrementing id.
//!
//! The two stores are eventually consistent at best: nothing reconciles an
//! item delivered through one with its copy in the other.

mod memory;
mod redb;

pub use memory::MemoryOutbox;
use s4_core::QueueItem;
use serde::{Deserialize, Serialize};

pub use self::redb::RedbOutbox;
use crate::error::StorageError;

/// One record in the outbox: a queue item plus its store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Auto-incremented id, unique for the lifetime of the store
    pub id: u64,
    /// The queued operation
    #[serde(flatten)]
    pub item: QueueItem,
}

/// Transactional id-keyed store of pending anchors.
///
/// Ids start at 1 and are never reused, even after deletes. Entries are
/// returned in id order, which is insertion order.
pub trait Outbox: Clone + Send + Sync + 'static {
    /// Store `item`, returning its new id.
    fn push(&self, item: &QueueItem) -> Result<u64, StorageError>;

    /// All stored entries in id order.
    fn entries(&self) -> Result<Vec<OutboxEntry>, StorageError>;

    /// Delete the entry with `id`. Returns `false` if it was not present.
    fn delete(&self, id: u64) -> Result<bool, StorageError>;

    /// Number of stored entries.
    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.entries()?.len())
    }

    /// Whether the outbox holds no entries.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}
