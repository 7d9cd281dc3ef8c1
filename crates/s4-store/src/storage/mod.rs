//! Key-value storage for the page-side queue
//!
//! A string-keyed, string-valued namespace with whole-value reads and writes,
//! the shape the queue store needs. The trait is synchronous (no async) to
//! keep the storage API simple; callers on an async runtime treat each call
//! as a short blocking operation.

mod chaotic;
mod memory;
mod redb;

pub use chaotic::{ChaoticStorage, Fault, FaultOp};
pub use memory::MemoryStorage;

pub use self::redb::RedbStorage;
use crate::error::StorageError;

/// Storage key holding the plaintext fallback copy of the queue.
pub const QUEUE_PLAIN_KEY: &str = "offline_queue_plain";

/// Storage key holding the encrypted queue blob.
pub const QUEUE_ENCRYPTED_KEY: &str = "offline_queue_encrypted";

/// Storage key holding the ISO-8601 time of the last successful batch sync.
pub const LAST_SYNC_KEY: &str = "offline_last_sync";

/// Storage key holding the subscription tier the user selected.
pub const SELECTED_TIER_KEY: &str = "s4_selected_tier";

/// String key-value storage.
///
/// Must be Clone (shared between the queue store, the interceptor and the
/// sync engine), Send + Sync, and synchronous. Implementations share internal
/// state via Arc, so clones access the same underlying namespace.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Value stored under `key`, or `None`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Whether `key` holds a value.
    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}
