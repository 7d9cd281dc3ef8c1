//! Fuzz target for the encrypted queue store under storage failures
//!
//! # Strategy
//!
//! - Variable failure rates (0% to 90%) via ChaoticStorage
//! - Interleaved appends, removals, clears, syncs, prunes and raw saves
//!
//! # Invariants
//!
//! - NEVER panic on storage errors
//! - A fault-free reload always returns the last queue whose plaintext
//!   write succeeded (no older queue resurrected)

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use s4_core::QueueItem;
use s4_crypto::{DeviceFingerprint, KdfParams, KeyProvider};
use s4_harness::SimEnv;
use s4_store::{ChaoticStorage, MemoryStorage, QueueStore};

#[derive(Debug, Arbitrary)]
struct Scenario {
    chaos_seed: u64,
    failure_rate_tenth: u8,
    operations: Vec<Operation>,
}

#[derive(Debug, Arbitrary)]
enum Operation {
    Append(u8),
    RemoveItem(u8),
    Clear,
    MarkAllSynced,
    RemoveSynced,
    Load,
}

fn keys() -> Arc<KeyProvider> {
    Arc::new(KeyProvider::with_params(
        DeviceFingerprint::new("s4-fuzz", "https://s4ledger.test"),
        KdfParams { iterations: 1, ..KdfParams::default() },
    ))
}

fuzz_target!(|scenario: Scenario| {
    let failure_rate = f64::from(scenario.failure_rate_tenth % 10) / 10.0;
    let storage = ChaoticStorage::with_seed(MemoryStorage::new(), failure_rate, scenario.chaos_seed);
    let store = QueueStore::new(storage.clone(), SimEnv::new(), keys());

    let mut committed: Vec<QueueItem> = Vec::new();

    for op in scenario.operations.into_iter().take(64) {
        let result = match op {
            Operation::Append(n) => {
                store.append(QueueItem::new(format!("{n:02x}"), "FUZZ", "", "2026-01-01T00:00:00.000Z")).map(|_| ())
            },
            Operation::RemoveItem(i) => store.remove_item(usize::from(i)).map(|_| ()),
            Operation::Clear => store.clear(),
            Operation::MarkAllSynced => {
                let batch = store.load_queue();
                store.mark_synced(&batch, "2026-01-01T00:00:01.000Z").map(|_| ())
            },
            Operation::RemoveSynced => store.remove_synced().map(|_| ()),
            Operation::Load => {
                let _ = store.load_queue();
                continue;
            },
        };
        if result.is_ok() {
            committed = store.snapshot();
        }
    }

    let reloaded = QueueStore::new(storage.inner().clone(), SimEnv::new(), keys()).load_queue();
    assert_eq!(reloaded, committed);
});
