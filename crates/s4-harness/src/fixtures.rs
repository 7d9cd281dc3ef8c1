//! Builders for the page-side stack used across integration tests.

use std::sync::Arc;

use s4_client::{Connectivity, OfflineFetch, SyncEngine};
use s4_core::{BackoffPolicy, QueueItem};
use s4_crypto::{DeviceFingerprint, KdfParams, KeyProvider};
use s4_store::{MemoryStorage, QueueStore, Storage};

use crate::{SimEnv, SimServer};

/// Origin used for test fingerprints.
pub const TEST_ORIGIN: &str = "https://s4ledger.test";

/// Iterations for test key derivation. Production uses 100k.
pub const TEST_KDF_ITERATIONS: u32 = 64;

/// Key provider with a fixed fingerprint and cheap derivation.
pub fn test_keys() -> Arc<KeyProvider> {
    Arc::new(KeyProvider::with_params(
        DeviceFingerprint::new("s4-harness/test", TEST_ORIGIN),
        KdfParams { iterations: TEST_KDF_ITERATIONS, ..KdfParams::default() },
    ))
}

/// Key provider with no fingerprint material: every derivation fails.
pub fn unavailable_keys() -> Arc<KeyProvider> {
    Arc::new(KeyProvider::new(DeviceFingerprint::new("", "")))
}

/// Queue store over `storage` with [`test_keys`].
pub fn queue_store<S: Storage>(storage: S, env: SimEnv) -> Arc<QueueStore<S, SimEnv>> {
    Arc::new(QueueStore::new(storage, env, test_keys()))
}

/// Unsynced item with a fixed timestamp.
pub fn item(hash: &str) -> QueueItem {
    QueueItem::new(hash, "TEST", "JOINT", "2026-01-01T00:00:00.000Z")
}

/// Everything one page context holds, wired against a [`SimServer`].
pub struct PageStack {
    /// Simulated clock and RNG
    pub env: SimEnv,
    /// Scripted server behind the interceptor and the engine
    pub server: SimServer,
    /// Page-side storage namespace
    pub storage: MemoryStorage,
    /// Encrypted queue over `storage`
    pub queue: Arc<QueueStore<MemoryStorage, SimEnv>>,
    /// Connectivity flag shared by interceptor and engine
    pub connectivity: Connectivity,
}

impl PageStack {
    /// Fresh page context: empty storage, online, healthy server.
    pub fn new() -> Self {
        Self::with_server(SimServer::ledger())
    }

    /// Fresh page context talking to `server`.
    pub fn with_server(server: SimServer) -> Self {
        let env = SimEnv::new();
        let storage = MemoryStorage::new();
        let queue = queue_store(storage.clone(), env.clone());
        Self { env, server, storage, queue, connectivity: Connectivity::new(true) }
    }

    /// Interceptor wrapping the server.
    pub fn fetch(&self) -> OfflineFetch<SimServer, MemoryStorage, SimEnv> {
        OfflineFetch::new(self.server.clone(), Arc::clone(&self.queue), self.connectivity.clone())
    }

    /// Sync engine with the default backoff policy.
    pub fn engine(&self) -> SyncEngine<SimServer, MemoryStorage, SimEnv> {
        SyncEngine::new(self.server.clone(), Arc::clone(&self.queue), self.connectivity.clone())
    }

    /// Sync engine with `policy`.
    pub fn engine_with(&self, policy: BackoffPolicy) -> SyncEngine<SimServer, MemoryStorage, SimEnv> {
        self.engine().with_policy(policy)
    }
}

impl Default for PageStack {
    fn default() -> Self {
        Self::new()
    }
}
