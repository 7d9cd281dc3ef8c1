//! Queue encryption using AES-256-GCM
//!
//! All functions are pure - the IV must be provided by the caller, and it
//! must be fresh random bytes for every seal in production.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use serde::{Deserialize, Serialize};

use crate::{error::CryptoError, kdf::QueueKey};

/// AES-GCM IV size (96 bits)
pub const IV_SIZE: usize = 12;

/// GCM authentication tag size (16 bytes)
const GCM_TAG_SIZE: usize = 16;

/// At-rest representation of the serialized queue.
///
/// Serializes as `{"iv": [..12 numbers..], "data": [..numbers..]}` so it can
/// live in a string-valued storage slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// The 12-byte IV used for this seal
    pub iv: [u8; IV_SIZE],
    /// Ciphertext including the 16-byte GCM tag
    pub data: Vec<u8>,
}

impl EncryptedBlob {
    /// Plaintext length (ciphertext length minus authentication tag).
    pub fn plaintext_len(&self) -> usize {
        self.data.len().saturating_sub(GCM_TAG_SIZE)
    }
}

/// Encrypt `plaintext` under `key` with the caller-supplied IV.
///
/// # Errors
///
/// - `EncryptionFailed`: the AEAD rejected the input (plaintext too large)
pub fn seal(key: &QueueKey, plaintext: &[u8], iv: [u8; IV_SIZE]) -> Result<EncryptedBlob, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let data = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptedBlob { iv, data })
}

/// Decrypt a blob produced by [`seal`].
///
/// # Errors
///
/// - `DecryptionFailed`: truncated data, tampered ciphertext, or a key derived
///   from different fingerprint inputs
pub fn open(key: &QueueKey, blob: &EncryptedBlob) -> Result<Vec<u8>, CryptoError> {
    if blob.data.len() < GCM_TAG_SIZE {
        return Err(CryptoError::DecryptionFailed {
            reason: format!("ciphertext shorter than tag: {} bytes", blob.data.len()),
        });
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| {
        CryptoError::DecryptionFailed { reason: e.to_string() }
    })?;

    cipher.decrypt(Nonce::from_slice(&blob.iv), blob.data.as_slice()).map_err(|_| {
        CryptoError::DecryptionFailed { reason: "authentication failed".to_string() }
    })
}
