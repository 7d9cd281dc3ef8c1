//! Encrypted queue store.
//!
//! Persists the pending-anchor queue in a [`Storage`] namespace, encrypted at
//! rest with the device-derived queue key.
//!
//! # Save cycle
//!
//! ```text
//! Plaintext-Written ──> Encrypting ──> Encrypted-Written ──> Plaintext-Removed
//!   (phase 1)                           (phase 2)              (phase 3)
//! ```
//!
//! Phase 1 must succeed for a save to count. Phases 2 and 3 are best-effort:
//! if encryption or the encrypted write fails, the plaintext copy stays as
//! the fallback and the queue degrades to unencrypted-at-rest instead of
//! losing data.
//!
//! # Recovery rule on load
//!
//! The plaintext copy only exists while a save is in flight, after a save
//! whose encryption failed, or as a legacy queue from before encryption. In
//! every one of those cases it is at least as new as any encrypted blob, so:
//!
//! 1. plaintext present → return it and re-commit it encrypted (this is also
//!    the one-time legacy migration)
//! 2. else encrypted present → decrypt it; an unreadable blob is discarded
//!    and the queue is empty
//! 3. else → empty
//!
//! After a completed save only the encrypted blob exists, so committed state
//! is always read from the encrypted form.

#![allow(clippy::disallowed_types, reason = "Synchronous read-modify-write guard, never held across await")]

use std::sync::{Arc, Mutex};

use s4_core::{Environment, QueueItem};
use s4_crypto::{CryptoError, EncryptedBlob, IV_SIZE, KeyProvider, open, seal};

use crate::{
    error::StorageError,
    storage::{LAST_SYNC_KEY, QUEUE_ENCRYPTED_KEY, QUEUE_PLAIN_KEY, SELECTED_TIER_KEY, Storage},
};

/// How far a save got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Encrypted blob written and plaintext copy removed (or removal pending)
    Encrypted,
    /// Only the plaintext copy was written
    PlaintextOnly,
}

/// Queue persisted in a storage namespace, encrypted at rest.
///
/// Every mutation is a full read-modify-write of the whole queue, serialized
/// by an internal guard so two callers in one context cannot interleave
/// their writes. Two contexts with separate storage never see each other.
pub struct QueueStore<S: Storage, E: Environment> {
    storage: S,
    env: E,
    keys: Arc<KeyProvider>,
    /// Last successfully loaded or saved queue, for synchronous readers
    cache: Mutex<Vec<QueueItem>>,
    /// Serializes read-modify-write cycles
    write_guard: Mutex<()>,
}

impl<S: Storage, E: Environment> QueueStore<S, E> {
    /// Store over `storage`, encrypting with keys from `keys`.
    pub fn new(storage: S, env: E, keys: Arc<KeyProvider>) -> Self {
        Self { storage, env, keys, cache: Mutex::new(Vec::new()), write_guard: Mutex::new(()) }
    }

    /// Underlying storage namespace.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Environment used for IVs and timestamps.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Load the queue.
    ///
    /// Never fails: storage errors and unreadable blobs are logged and yield
    /// an empty queue so callers always get a usable value.
    #[allow(clippy::expect_used)]
    pub fn load_queue(&self) -> Vec<QueueItem> {
        let _guard = self.write_guard.lock().expect("write guard poisoned");
        match self.read() {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read offline queue; treating as empty");
                Vec::new()
            },
        }
    }

    /// Last successfully loaded or saved queue, without touching storage.
    ///
    /// May be stale; for code paths that must answer synchronously.
    #[allow(clippy::expect_used)]
    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.cache.lock().expect("cache poisoned").clone()
    }

    /// Replace the persisted queue with `items`.
    ///
    /// # Errors
    ///
    /// Returns the storage error if even the plaintext write failed. Failures
    /// after that point degrade to [`SaveOutcome::PlaintextOnly`].
    #[allow(clippy::expect_used)]
    pub fn save_queue(&self, items: &[QueueItem]) -> Result<SaveOutcome, StorageError> {
        let _guard = self.write_guard.lock().expect("write guard poisoned");
        self.write(items)
    }

    /// Load, mutate with `f`, save. The queue cannot change in between.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the save's plaintext write failed.
    #[allow(clippy::expect_used)]
    pub fn modify<R>(&self, f: impl FnOnce(&mut Vec<QueueItem>) -> R) -> Result<R, StorageError> {
        let _guard = self.write_guard.lock().expect("write guard poisoned");
        let mut items = self.read()?;
        let result = f(&mut items);
        self.write(&items)?;
        Ok(result)
    }

    /// Append `item`, returning the new queue length.
    pub fn append(&self, item: QueueItem) -> Result<usize, StorageError> {
        self.modify(|items| {
            items.push(item);
            items.len()
        })
    }

    /// Append `item` unless an unsynced item with the same hash is queued.
    ///
    /// Returns the new queue length, or `None` if the hash was already
    /// waiting.
    pub fn append_unless_queued(&self, item: QueueItem) -> Result<Option<usize>, StorageError> {
        self.modify(|items| {
            if items.iter().any(|queued| queued.is_pending() && queued.hash == item.hash) {
                return None;
            }
            items.push(item);
            Some(items.len())
        })
    }

    /// Remove the item at `index`. `None` if out of range.
    pub fn remove_item(&self, index: usize) -> Result<Option<QueueItem>, StorageError> {
        self.modify(|items| (index < items.len()).then(|| items.remove(index)))
    }

    /// Remove every item.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.modify(Vec::clear)
    }

    /// Remove items the server already confirmed. Returns how many went.
    pub fn remove_synced(&self) -> Result<usize, StorageError> {
        self.modify(|items| {
            let before = items.len();
            items.retain(QueueItem::is_pending);
            before - items.len()
        })
    }

    /// Mark the items of a delivered `batch` as synced at `at`.
    ///
    /// Items are matched by `(hash, timestamp)`; anything appended after the
    /// batch was taken stays pending. Returns how many items flipped.
    pub fn mark_synced(&self, batch: &[QueueItem], at: &str) -> Result<usize, StorageError> {
        self.modify(|items| {
            let mut flipped = 0;
            for item in items.iter_mut() {
                let in_batch = batch
                    .iter()
                    .any(|sent| sent.hash == item.hash && sent.timestamp == item.timestamp);
                if in_batch && item.mark_synced(at) {
                    flipped += 1;
                }
            }
            flipped
        })
    }

    /// Time of the last successful batch sync, if any.
    pub fn last_sync(&self) -> Option<String> {
        self.storage.get(LAST_SYNC_KEY).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "failed to read last sync time");
            None
        })
    }

    /// Record a successful batch sync at `at`.
    pub fn record_last_sync(&self, at: &str) -> Result<(), StorageError> {
        self.storage.set(LAST_SYNC_KEY, at)
    }

    /// Subscription tier the user selected locally, if any.
    pub fn selected_tier(&self) -> Option<String> {
        self.storage.get(SELECTED_TIER_KEY).ok().flatten()
    }

    /// Read following the recovery rule. Caller holds the write guard.
    fn read(&self) -> Result<Vec<QueueItem>, StorageError> {
        let plaintext = self.read_plaintext()?;
        let encrypted = self.storage.get(QUEUE_ENCRYPTED_KEY)?;

        let items = match (plaintext, encrypted) {
            (Some(items), encrypted) => {
                if encrypted.is_some() {
                    tracing::debug!(len = items.len(), "recovering interrupted queue save");
                } else {
                    tracing::info!(len = items.len(), "migrating plaintext queue to encrypted storage");
                }
                self.commit_encrypted(&items);
                items
            },
            (None, Some(raw)) => match self.decrypt(&raw) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable encrypted queue");
                    if let Err(e) = self.storage.remove(QUEUE_ENCRYPTED_KEY) {
                        tracing::warn!(error = %e, "failed to remove unreadable queue blob");
                    }
                    Vec::new()
                },
            },
            (None, None) => Vec::new(),
        };

        self.set_cache(items.clone());
        Ok(items)
    }

    /// Plaintext copy, if present and parseable.
    fn read_plaintext(&self) -> Result<Option<Vec<QueueItem>>, StorageError> {
        let Some(raw) = self.storage.get(QUEUE_PLAIN_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<QueueItem>>(&raw) {
            Ok(items) => Ok(Some(items)),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unparseable plaintext queue copy");
                Ok(None)
            },
        }
    }

    /// Phase 1, then best-effort phases 2 and 3. Caller holds the write guard.
    fn write(&self, items: &[QueueItem]) -> Result<SaveOutcome, StorageError> {
        let json = serde_json::to_string(items)?;
        self.storage.set(QUEUE_PLAIN_KEY, &json)?;
        self.set_cache(items.to_vec());

        Ok(self.commit_encrypted(items))
    }

    /// Phases 2 and 3: write the encrypted blob, then drop the plaintext.
    fn commit_encrypted(&self, items: &[QueueItem]) -> SaveOutcome {
        let blob = match self.seal(items) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(error = %e, "queue encryption unavailable; keeping plaintext copy");
                return SaveOutcome::PlaintextOnly;
            },
        };

        if let Err(e) = self.storage.set(QUEUE_ENCRYPTED_KEY, &blob) {
            tracing::warn!(error = %e, "failed to write encrypted queue; keeping plaintext copy");
            return SaveOutcome::PlaintextOnly;
        }

        if let Err(e) = self.storage.remove(QUEUE_PLAIN_KEY) {
            // Both copies now hold the same queue; the next load cleans up.
            tracing::warn!(error = %e, "failed to remove plaintext queue copy");
        }
        SaveOutcome::Encrypted
    }

    /// Serialize, encrypt under a fresh IV, and encode the blob as JSON.
    fn seal(&self, items: &[QueueItem]) -> Result<String, CryptoError> {
        let plaintext =
            serde_json::to_vec(items).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let key = self.keys.get_key()?;

        let mut iv = [0u8; IV_SIZE];
        self.env.random_bytes(&mut iv);

        let blob = seal(&key, &plaintext, iv)?;
        serde_json::to_string(&blob).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
    }

    fn decrypt(&self, raw: &str) -> Result<Vec<QueueItem>, CryptoError> {
        let blob: EncryptedBlob = serde_json::from_str(raw)
            .map_err(|e| CryptoError::DecryptionFailed { reason: format!("blob: {e}") })?;
        let key = self.keys.get_key()?;
        let plaintext = open(&key, &blob)?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| CryptoError::DecryptionFailed { reason: format!("queue: {e}") })
    }

    #[allow(clippy::expect_used)]
    fn set_cache(&self, items: Vec<QueueItem>) {
        *self.cache.lock().expect("cache poisoned") = items;
    }
}
