//! Error types for at-rest cryptography.

use thiserror::Error;

/// Errors from key derivation and AEAD operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The environment cannot supply what key derivation needs.
    ///
    /// There is no fallback to unencrypted key material: callers decide
    /// whether to degrade to plaintext storage.
    #[error("unsupported environment: {reason}")]
    UnsupportedEnvironment {
        /// What was missing
        reason: String,
    },

    /// Key derivation parameters are unusable (e.g. zero iterations).
    #[error("invalid key derivation parameters: {0}")]
    InvalidParams(String),

    /// Sealing the plaintext failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Authentication tag mismatch, truncated blob, or wrong key.
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Why decryption was rejected
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if encryption cannot work in this environment at all.
    ///
    /// Such errors will recur on every attempt, so storage layers should keep
    /// their plaintext fallback rather than retry.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::UnsupportedEnvironment { .. } | Self::InvalidParams(_))
    }
}
