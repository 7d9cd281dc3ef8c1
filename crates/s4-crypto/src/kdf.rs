//! Queue key derivation using PBKDF2-HMAC-SHA256
//!
//! The key is never generated-and-stored. It is re-derived on each process
//! start from a device fingerprint, so the same device recovers the same key
//! without a user-visible secret.

use std::sync::{Arc, OnceLock};

use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Fixed application salt mixed into every derivation.
pub const APP_SALT: &str = "s4-ledger-offline-queue-v1";

/// Iteration count for PBKDF2-HMAC-SHA256.
pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;

/// Length of the derived AES-256 key in bytes.
const KEY_LEN: usize = 32;

/// Stable-but-not-secret identifiers of the running client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFingerprint {
    /// Client identifier string (user-agent style).
    pub client_id: String,
    /// Origin of the service the queue belongs to.
    pub origin: String,
}

impl DeviceFingerprint {
    /// Fingerprint from explicit identifiers.
    pub fn new(client_id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), origin: origin.into() }
    }

    /// Fingerprint for this build running on this platform against `origin`.
    pub fn detect(origin: impl Into<String>) -> Self {
        let client_id = format!(
            "{}/{} ({}; {})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH,
        );
        Self { client_id, origin: origin.into() }
    }

    /// Password bytes fed to PBKDF2: `client_id || "|" || origin`.
    fn password(&self) -> Vec<u8> {
        let mut password = Vec::with_capacity(self.client_id.len() + 1 + self.origin.len());
        password.extend_from_slice(self.client_id.as_bytes());
        password.push(b'|');
        password.extend_from_slice(self.origin.as_bytes());
        password
    }
}

/// PBKDF2 parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    /// PBKDF2 iteration count
    pub iterations: u32,
    /// Salt (fixed per application)
    pub salt: String,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self { iterations: DEFAULT_KDF_ITERATIONS, salt: APP_SALT.to_string() }
    }
}

/// 256-bit symmetric key for the persisted queue.
///
/// Zeroized on drop. Deliberately has no `Debug` or `Serialize` impl.
pub struct QueueKey {
    key: [u8; KEY_LEN],
}

impl QueueKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Raw key bytes for AES-256-GCM.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl Drop for QueueKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Derives the queue key once and caches it for the lifetime of the provider.
///
/// One provider per execution context. Clones of the returned `Arc` all point
/// at the same in-memory key; no disk or network I/O happens here.
pub struct KeyProvider {
    fingerprint: DeviceFingerprint,
    params: KdfParams,
    cached: OnceLock<Arc<QueueKey>>,
}

impl KeyProvider {
    /// Provider with the default PBKDF2 parameters.
    pub fn new(fingerprint: DeviceFingerprint) -> Self {
        Self::with_params(fingerprint, KdfParams::default())
    }

    /// Provider with explicit parameters.
    pub fn with_params(fingerprint: DeviceFingerprint, params: KdfParams) -> Self {
        Self { fingerprint, params, cached: OnceLock::new() }
    }

    /// The queue key, deriving it on first call.
    ///
    /// # Errors
    ///
    /// - `UnsupportedEnvironment`: the fingerprint carries no identifying
    ///   material, so a derived key would be the same on every device
    /// - `InvalidParams`: zero iterations or an empty salt
    pub fn get_key(&self) -> Result<Arc<QueueKey>, CryptoError> {
        if let Some(key) = self.cached.get() {
            return Ok(Arc::clone(key));
        }

        let derived = Arc::new(derive_key(&self.fingerprint, &self.params)?);
        Ok(Arc::clone(self.cached.get_or_init(|| derived)))
    }

    /// Whether the key has been derived already.
    pub fn is_cached(&self) -> bool {
        self.cached.get().is_some()
    }
}

/// Derive a queue key without caching.
///
/// Deterministic: the same fingerprint and parameters always give the same
/// key.
pub fn derive_key(fingerprint: &DeviceFingerprint, params: &KdfParams) -> Result<QueueKey, CryptoError> {
    if fingerprint.client_id.is_empty() && fingerprint.origin.is_empty() {
        return Err(CryptoError::UnsupportedEnvironment {
            reason: "no client identifier or origin available for key derivation".to_string(),
        });
    }
    if params.iterations == 0 {
        return Err(CryptoError::InvalidParams("iteration count must be non-zero".to_string()));
    }
    if params.salt.is_empty() {
        return Err(CryptoError::InvalidParams("salt must be non-empty".to_string()));
    }

    let mut password = fingerprint.password();
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(&password, params.salt.as_bytes(), params.iterations, &mut key);
    password.zeroize();

    Ok(QueueKey { key })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> KdfParams {
        KdfParams { iterations: 10, ..KdfParams::default() }
    }

    fn fingerprint() -> DeviceFingerprint {
        DeviceFingerprint::new("s4-test-agent/1.0", "https://s4ledger.test")
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_key(&fingerprint(), &fast_params()).unwrap();
        let b = derive_key(&fingerprint(), &fast_params()).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_origin_gives_different_key() {
        let other = DeviceFingerprint::new("s4-test-agent/1.0", "https://other.test");
        let a = derive_key(&fingerprint(), &fast_params()).unwrap();
        let b = derive_key(&other, &fast_params()).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn rfc7914_vector() {
        // PBKDF2-HMAC-SHA256 P="passwd", S="salt", c=1, first 32 bytes
        let mut key = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(b"passwd", b"salt", 1, &mut key);
        assert_eq!(
            hex::encode(key),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn provider_caches_the_same_key() {
        let provider = KeyProvider::with_params(fingerprint(), fast_params());
        assert!(!provider.is_cached());

        let first = provider.get_key().unwrap();
        let second = provider.get_key().unwrap();

        assert!(provider.is_cached());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn empty_fingerprint_is_unsupported() {
        let provider = KeyProvider::with_params(DeviceFingerprint::new("", ""), fast_params());
        let err = provider.get_key().err().unwrap();
        assert!(matches!(err, CryptoError::UnsupportedEnvironment { .. }));
        assert!(!provider.is_cached());
    }

    #[test]
    fn zero_iterations_rejected() {
        let params = KdfParams { iterations: 0, ..KdfParams::default() };
        assert!(matches!(derive_key(&fingerprint(), &params), Err(CryptoError::InvalidParams(_))));
    }

    #[test]
    fn detect_includes_platform() {
        let fp = DeviceFingerprint::detect("https://s4ledger.test");
        assert!(fp.client_id.contains(std::env::consts::OS));
        assert_eq!(fp.origin, "https://s4ledger.test");
    }

    #[test]
    fn default_params_match_constants() {
        let params = KdfParams::default();
        assert_eq!(params.iterations, 100_000);
        assert_eq!(params.salt, APP_SALT);
    }
}
