//! Queue item model.
//!
//! A [`QueueItem`] is one pending (or completed) anchor submission held on the
//! client. Items are created unsynced, flip to synced exactly once when the
//! server confirms receipt, and are only removed by an explicit prune.

use serde::{Deserialize, Serialize};

/// Branch tag applied when a producer does not supply one.
pub const DEFAULT_BRANCH: &str = "JOINT";

/// Hash recorded when an intercepted anchor request carries none.
pub const UNKNOWN_HASH: &str = "UNKNOWN";

/// Record type for anchors captured by the offline interceptor.
pub const RECORD_QUEUED_ANCHOR: &str = "QUEUED_ANCHOR";

/// Record type for vault records queued by the user.
pub const RECORD_VAULT: &str = "VAULT_RECORD";

/// Record type for session hashes.
pub const RECORD_SESSION_HASH: &str = "SESSION_HASH";

/// One pending anchor operation.
///
/// Serialized field names match the server's sync endpoint
/// (`{"hash", "record_type", "branch", "timestamp", "synced", "synced_at"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Hex-encoded content fingerprint. Immutable once created.
    pub hash: String,
    /// Payload classification tag. Never empty.
    pub record_type: String,
    /// Organizational classification.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// ISO-8601 creation time. Never mutated.
    pub timestamp: String,
    /// True once the server confirmed receipt.
    #[serde(default)]
    pub synced: bool,
    /// ISO-8601 time `synced` flipped to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<String>,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

impl QueueItem {
    /// New unsynced item.
    ///
    /// Empty `record_type` falls back to [`RECORD_QUEUED_ANCHOR`] and empty
    /// `branch` to [`DEFAULT_BRANCH`], keeping the non-empty invariants.
    pub fn new(
        hash: impl Into<String>,
        record_type: impl Into<String>,
        branch: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        let record_type = record_type.into();
        let branch = branch.into();
        Self {
            hash: hash.into(),
            record_type: if record_type.is_empty() {
                RECORD_QUEUED_ANCHOR.to_string()
            } else {
                record_type
            },
            branch: if branch.is_empty() { default_branch() } else { branch },
            timestamp: timestamp.into(),
            synced: false,
            synced_at: None,
        }
    }

    /// Whether this item still has to reach the server.
    pub fn is_pending(&self) -> bool {
        !self.synced
    }

    /// Mark the item synced at `at`.
    ///
    /// Returns `false` (and changes nothing) if it was already synced, so
    /// `synced_at` is written exactly once.
    pub fn mark_synced(&mut self, at: &str) -> bool {
        if self.synced {
            return false;
        }
        self.synced = true;
        self.synced_at = Some(at.to_string());
        true
    }
}

/// Clones of every unsynced item, in queue order.
pub fn pending_items(items: &[QueueItem]) -> Vec<QueueItem> {
    items.iter().filter(|item| item.is_pending()).cloned().collect()
}

/// Counts of a queue by sync state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    /// Items not yet confirmed by the server
    pub pending: usize,
    /// Items confirmed by the server but not pruned
    pub synced: usize,
}

impl QueueCounts {
    /// Count `items`.
    pub fn of(items: &[QueueItem]) -> Self {
        let synced = items.iter().filter(|item| item.synced).count();
        Self { pending: items.len() - synced, synced }
    }

    /// Total items held locally.
    pub fn total(&self) -> usize {
        self.pending + self.synced
    }
}
