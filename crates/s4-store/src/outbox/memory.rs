#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use s4_core::QueueItem;

use super::{Outbox, OutboxEntry};
use crate::error::StorageError;

#[derive(Default)]
struct Inner {
    entries: BTreeMap<u64, QueueItem>,
    last_id: u64,
}

/// In-memory outbox for testing. Clones share one store.
#[derive(Clone, Default)]
pub struct MemoryOutbox {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryOutbox {
    /// Create a new empty outbox.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Outbox for MemoryOutbox {
    #[allow(clippy::expect_used)]
    fn push(&self, item: &QueueItem) -> Result<u64, StorageError> {
        let mut inner = self.inner.lock().expect("outbox poisoned");
        inner.last_id += 1;
        let id = inner.last_id;
        inner.entries.insert(id, item.clone());
        Ok(id)
    }

    #[allow(clippy::expect_used)]
    fn entries(&self) -> Result<Vec<OutboxEntry>, StorageError> {
        let inner = self.inner.lock().expect("outbox poisoned");
        Ok(inner
            .entries
            .iter()
            .map(|(id, item)| OutboxEntry { id: *id, item: item.clone() })
            .collect())
    }

    #[allow(clippy::expect_used)]
    fn delete(&self, id: u64) -> Result<bool, StorageError> {
        Ok(self.inner.lock().expect("outbox poisoned").entries.remove(&id).is_some())
    }

    #[allow(clippy::expect_used)]
    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.inner.lock().expect("outbox poisoned").entries.len())
    }
}
