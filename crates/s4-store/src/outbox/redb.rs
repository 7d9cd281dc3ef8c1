//! Redb-backed durable outbox.
//!
//! Push, delete and the id counter bump each commit in a single write
//! transaction, so a crash never leaves an entry without its id reserved.

use std::{path::Path, sync::Arc};

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use s4_core::QueueItem;

use super::{Outbox, OutboxEntry};
use crate::error::StorageError;

/// Table: pending_anchors
/// Key: entry id
/// Value: JSON-encoded `QueueItem`
const PENDING_ANCHORS: TableDefinition<u64, &[u8]> = TableDefinition::new("pending_anchors");

/// Table: meta
/// Key: counter name
/// Value: last id handed out
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const LAST_ID: &str = "last_id";

/// Durable outbox backed by Redb. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbOutbox {
    db: Arc<Database>,
}

impl RedbOutbox {
    /// Open or create an outbox database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        {
            let _ = txn.open_table(PENDING_ANCHORS).map_err(io)?;
            let _ = txn.open_table(META).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl Outbox for RedbOutbox {
    fn push(&self, item: &QueueItem) -> Result<u64, StorageError> {
        let bytes = serde_json::to_vec(item)?;

        let txn = self.db.begin_write().map_err(io)?;
        let id = {
            let mut meta = txn.open_table(META).map_err(io)?;
            let last = meta.get(LAST_ID).map_err(io)?.map_or(0, |guard| guard.value());
            let id = last + 1;
            meta.insert(LAST_ID, id).map_err(io)?;

            let mut table = txn.open_table(PENDING_ANCHORS).map_err(io)?;
            table.insert(id, bytes.as_slice()).map_err(io)?;
            id
        };
        txn.commit().map_err(io)?;

        Ok(id)
    }

    fn entries(&self) -> Result<Vec<OutboxEntry>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(PENDING_ANCHORS).map_err(io)?;

        let mut entries = Vec::new();
        for row in table.iter().map_err(io)? {
            let (id, value) = row.map_err(io)?;
            let item: QueueItem = serde_json::from_slice(value.value())?;
            entries.push(OutboxEntry { id: id.value(), item });
        }
        Ok(entries)
    }

    fn delete(&self, id: u64) -> Result<bool, StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        let removed = {
            let mut table = txn.open_table(PENDING_ANCHORS).map_err(io)?;
            table.remove(id).map_err(io)?.is_some()
        };
        txn.commit().map_err(io)?;
        Ok(removed)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(PENDING_ANCHORS).map_err(io)?;
        let len = table.len().map_err(io)?;
        usize::try_from(len).map_err(|e| StorageError::Io(e.to_string()))
    }
}

fn io(e: impl std::fmt::Display) -> StorageError {
    StorageError::Io(e.to_string())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn item(hash: &str) -> QueueItem {
        QueueItem::new(hash, "QUEUED_ANCHOR", "JOINT", "2026-10-19T08:30:00.000Z")
    }

    #[test]
    fn push_list_delete() {
        let dir = tempdir().unwrap();
        let outbox = RedbOutbox::open(dir.path().join("outbox.redb")).unwrap();

        let a = outbox.push(&item("a")).unwrap();
        let b = outbox.push(&item("b")).unwrap();
        assert_eq!((a, b), (1, 2));

        assert!(outbox.delete(a).unwrap());
        assert!(!outbox.delete(a).unwrap());

        let entries = outbox.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 2);
        assert_eq!(entries[0].item.hash, "b");
        assert_eq!(outbox.len().unwrap(), 1);
    }

    #[test]
    fn entries_and_counter_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("outbox.redb");

        {
            let outbox = RedbOutbox::open(&path).unwrap();
            outbox.push(&item("a")).unwrap();
            outbox.push(&item("b")).unwrap();
            outbox.delete(2).unwrap();
        }

        let outbox = RedbOutbox::open(&path).unwrap();
        assert_eq!(outbox.entries().unwrap()[0].item.hash, "a");
        assert_eq!(outbox.push(&item("c")).unwrap(), 3);
    }
}
