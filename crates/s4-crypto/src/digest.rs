//! Content fingerprints for anchored payloads.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `content`.
///
/// This is the value stored in `QueueItem::hash` when a caller queues raw
/// content rather than a precomputed hash.
pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
