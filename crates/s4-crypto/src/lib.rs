//! S4 Ledger at-rest cryptography
//!
//! Primitives backing the offline anchor queue's encryption at rest. Pure
//! functions with deterministic outputs: callers supply the random IV so the
//! same inputs always produce the same blob under test.
//!
//! # Key Lifecycle
//!
//! ```text
//! DeviceFingerprint (client id + origin)
//!        │
//!        ▼
//! PBKDF2-HMAC-SHA256 (100k iterations, fixed app salt)
//!        │
//!        ▼
//! QueueKey (cached in memory by KeyProvider, never persisted)
//!        │
//!        ▼
//! AES-256-GCM (fresh 96-bit IV per seal) → EncryptedBlob
//! ```
//!
//! # Security
//!
//! The key is re-derivable from stable, non-secret inputs present on the
//! device. This keeps casual readers of the storage namespace from seeing
//! queued hashes. It does not protect against anyone who can read the same
//! environment identifiers.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod digest;
mod error;
mod kdf;
mod seal;

pub use digest::sha256_hex;
pub use error::CryptoError;
pub use kdf::{
    APP_SALT, DEFAULT_KDF_ITERATIONS, DeviceFingerprint, KdfParams, KeyProvider, QueueKey, derive_key,
};
pub use seal::{EncryptedBlob, IV_SIZE, open, seal};
