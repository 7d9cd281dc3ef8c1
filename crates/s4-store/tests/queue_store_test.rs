//! Encrypted queue store behaviour across the two-phase save.

use s4_core::QueueItem;
use s4_crypto::EncryptedBlob;
use s4_harness::{
    SimEnv,
    fixtures::{item, queue_store, test_keys, unavailable_keys},
};
use s4_store::{
    ChaoticStorage, Fault, FaultOp, MemoryStorage, QUEUE_ENCRYPTED_KEY, QUEUE_PLAIN_KEY, QueueStore,
    RedbStorage, SaveOutcome, Storage,
};

fn items(hashes: &[&str]) -> Vec<QueueItem> {
    hashes.iter().map(|hash| item(hash)).collect()
}

#[test]
fn empty_storage_loads_empty() {
    let store = queue_store(MemoryStorage::new(), SimEnv::new());
    assert!(store.load_queue().is_empty());
}

#[test]
fn completed_save_leaves_only_ciphertext() {
    let storage = MemoryStorage::new();
    let store = queue_store(storage.clone(), SimEnv::new());

    let outcome = store.save_queue(&items(&["deadbeef"])).unwrap();

    assert_eq!(outcome, SaveOutcome::Encrypted);
    assert!(!storage.contains(QUEUE_PLAIN_KEY).unwrap());
    let raw = storage.get(QUEUE_ENCRYPTED_KEY).unwrap().unwrap();
    assert!(!raw.contains("deadbeef"));
    let blob: EncryptedBlob = serde_json::from_str(&raw).unwrap();
    assert!(blob.plaintext_len() > 0);
}

#[test]
fn round_trip_through_a_fresh_store() {
    let storage = MemoryStorage::new();
    let env = SimEnv::new();
    let queue = items(&["a", "b", "c"]);

    queue_store(storage.clone(), env.clone()).save_queue(&queue).unwrap();

    // New store, new provider: the key is re-derived from the same fingerprint.
    let reopened = queue_store(storage, env);
    assert_eq!(reopened.load_queue(), queue);
}

#[test]
fn every_save_uses_a_fresh_iv() {
    let storage = MemoryStorage::new();
    let store = queue_store(storage.clone(), SimEnv::new());
    let queue = items(&["a"]);

    store.save_queue(&queue).unwrap();
    let first: EncryptedBlob = serde_json::from_str(&storage.get(QUEUE_ENCRYPTED_KEY).unwrap().unwrap()).unwrap();
    store.save_queue(&queue).unwrap();
    let second: EncryptedBlob = serde_json::from_str(&storage.get(QUEUE_ENCRYPTED_KEY).unwrap().unwrap()).unwrap();

    assert_ne!(first.iv, second.iv);
}

#[test]
fn interrupted_before_encrypted_write_recovers_new_queue() {
    let storage = ChaoticStorage::targeted(MemoryStorage::new());
    let store = queue_store(storage.clone(), SimEnv::new());

    let old = items(&["old"]);
    store.save_queue(&old).unwrap();

    storage.inject(Fault::once(FaultOp::Set, QUEUE_ENCRYPTED_KEY));
    let new = items(&["old", "new"]);
    let outcome = store.save_queue(&new).unwrap();
    assert_eq!(outcome, SaveOutcome::PlaintextOnly);

    // Stale ciphertext and fresh plaintext coexist.
    assert!(storage.inner().contains(QUEUE_PLAIN_KEY).unwrap());
    assert!(storage.inner().contains(QUEUE_ENCRYPTED_KEY).unwrap());

    let reopened = queue_store(storage.inner().clone(), SimEnv::new());
    assert_eq!(reopened.load_queue(), new);
    assert!(!storage.inner().contains(QUEUE_PLAIN_KEY).unwrap());
    assert_eq!(queue_store(storage.inner().clone(), SimEnv::new()).load_queue(), new);
}

#[test]
fn interrupted_before_plaintext_removal_recovers() {
    let storage = ChaoticStorage::targeted(MemoryStorage::new());
    let store = queue_store(storage.clone(), SimEnv::new());

    storage.inject(Fault::once(FaultOp::Remove, QUEUE_PLAIN_KEY));
    let queue = items(&["a", "b"]);
    assert_eq!(store.save_queue(&queue).unwrap(), SaveOutcome::Encrypted);
    assert!(storage.inner().contains(QUEUE_PLAIN_KEY).unwrap());

    assert_eq!(store.load_queue(), queue);
    assert!(!storage.inner().contains(QUEUE_PLAIN_KEY).unwrap());
}

#[test]
fn failed_plaintext_write_is_an_error() {
    let storage = ChaoticStorage::targeted(MemoryStorage::new());
    let store = queue_store(storage.clone(), SimEnv::new());

    storage.inject(Fault::once(FaultOp::Set, QUEUE_PLAIN_KEY));
    assert!(store.save_queue(&items(&["a"])).is_err());
    assert!(store.load_queue().is_empty());
}

#[test]
fn legacy_plaintext_queue_is_migrated() {
    let storage = MemoryStorage::new();
    let legacy = items(&["legacy-1", "legacy-2"]);
    storage.set(QUEUE_PLAIN_KEY, &serde_json::to_string(&legacy).unwrap()).unwrap();

    let store = queue_store(storage.clone(), SimEnv::new());
    assert_eq!(store.load_queue(), legacy);

    assert!(!storage.contains(QUEUE_PLAIN_KEY).unwrap());
    assert!(storage.contains(QUEUE_ENCRYPTED_KEY).unwrap());
    assert_eq!(queue_store(storage, SimEnv::new()).load_queue(), legacy);
}

#[test]
fn undecryptable_blob_is_discarded() {
    let storage = MemoryStorage::new();
    queue_store(storage.clone(), SimEnv::new()).save_queue(&items(&["a"])).unwrap();

    let mut raw: serde_json::Value =
        serde_json::from_str(&storage.get(QUEUE_ENCRYPTED_KEY).unwrap().unwrap()).unwrap();
    let first = raw["data"][0].as_u64().unwrap();
    raw["data"][0] = serde_json::json!(first ^ 0xff);
    storage.set(QUEUE_ENCRYPTED_KEY, &raw.to_string()).unwrap();

    let store = queue_store(storage.clone(), SimEnv::new());
    assert!(store.load_queue().is_empty());
    assert!(!storage.contains(QUEUE_ENCRYPTED_KEY).unwrap());
}

#[test]
fn garbage_blob_is_discarded() {
    let storage = MemoryStorage::new();
    storage.set(QUEUE_ENCRYPTED_KEY, "not a blob").unwrap();

    let store = queue_store(storage.clone(), SimEnv::new());
    assert!(store.load_queue().is_empty());
    assert!(!storage.contains(QUEUE_ENCRYPTED_KEY).unwrap());
}

#[test]
fn blob_from_another_device_is_discarded() {
    let storage = MemoryStorage::new();
    queue_store(storage.clone(), SimEnv::new()).save_queue(&items(&["a"])).unwrap();

    let other_device = QueueStore::new(
        storage.clone(),
        SimEnv::new(),
        std::sync::Arc::new(s4_crypto::KeyProvider::with_params(
            s4_crypto::DeviceFingerprint::new("other-client", "https://elsewhere.test"),
            s4_crypto::KdfParams { iterations: 64, ..Default::default() },
        )),
    );
    assert!(other_device.load_queue().is_empty());
}

#[test]
fn unavailable_encryption_degrades_to_plaintext() {
    let storage = MemoryStorage::new();
    let store = QueueStore::new(storage.clone(), SimEnv::new(), unavailable_keys());
    let queue = items(&["a"]);

    assert_eq!(store.save_queue(&queue).unwrap(), SaveOutcome::PlaintextOnly);
    assert!(storage.contains(QUEUE_PLAIN_KEY).unwrap());
    assert!(!storage.contains(QUEUE_ENCRYPTED_KEY).unwrap());
    assert_eq!(store.load_queue(), queue);
}

#[test]
fn mutators_read_modify_write() {
    let store = queue_store(MemoryStorage::new(), SimEnv::new());

    assert_eq!(store.append(item("a")).unwrap(), 1);
    assert_eq!(store.append(item("b")).unwrap(), 2);
    assert_eq!(store.append_unless_queued(item("a")).unwrap(), None);
    assert_eq!(store.append_unless_queued(item("c")).unwrap(), Some(3));

    assert_eq!(store.remove_item(1).unwrap().map(|i| i.hash), Some("b".to_string()));
    assert_eq!(store.remove_item(9).unwrap(), None);

    let hashes: Vec<String> = store.load_queue().into_iter().map(|i| i.hash).collect();
    assert_eq!(hashes, ["a", "c"]);

    store.clear().unwrap();
    assert!(store.load_queue().is_empty());
}

#[test]
fn mark_synced_only_touches_the_batch() {
    let store = queue_store(MemoryStorage::new(), SimEnv::new());
    store.save_queue(&items(&["a", "b"])).unwrap();
    let batch = store.load_queue();

    let late = QueueItem::new("late", "TEST", "JOINT", "2026-01-01T00:00:09.000Z");
    store.append(late).unwrap();

    assert_eq!(store.mark_synced(&batch, "2026-01-01T00:00:10.000Z").unwrap(), 2);
    assert_eq!(store.mark_synced(&batch, "2026-01-01T00:00:20.000Z").unwrap(), 0);

    let queue = store.load_queue();
    assert!(queue[0].synced && queue[1].synced);
    assert_eq!(queue[0].synced_at.as_deref(), Some("2026-01-01T00:00:10.000Z"));
    assert!(!queue[2].synced);

    assert_eq!(store.remove_synced().unwrap(), 2);
    assert_eq!(store.load_queue().len(), 1);
}

#[test]
fn snapshot_tracks_last_load_or_save() {
    let storage = MemoryStorage::new();
    let store = queue_store(storage.clone(), SimEnv::new());
    assert!(store.snapshot().is_empty());

    store.save_queue(&items(&["a"])).unwrap();
    assert_eq!(store.snapshot().len(), 1);

    // Another writer to the same namespace is only seen after a load.
    queue_store(storage, SimEnv::new()).append(item("b")).unwrap();
    assert_eq!(store.snapshot().len(), 1);
    assert_eq!(store.load_queue().len(), 2);
    assert_eq!(store.snapshot().len(), 2);
}

#[test]
fn last_sync_round_trips() {
    let store = queue_store(MemoryStorage::new(), SimEnv::new());
    assert_eq!(store.last_sync(), None);
    store.record_last_sync("2026-01-01T00:00:10.000Z").unwrap();
    assert_eq!(store.last_sync().as_deref(), Some("2026-01-01T00:00:10.000Z"));
}

#[test]
fn redb_backed_queue_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.redb");
    let queue = items(&["a", "b"]);

    {
        let storage = RedbStorage::open(&path).unwrap();
        QueueStore::new(storage, SimEnv::new(), test_keys()).save_queue(&queue).unwrap();
    }

    let storage = RedbStorage::open(&path).unwrap();
    assert_eq!(QueueStore::new(storage, SimEnv::new(), test_keys()).load_queue(), queue);
}
