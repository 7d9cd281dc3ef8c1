//! Fuzz target for offline anchor body capture
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary request bodies, mostly not JSON
//! - Shaped JSON: objects with fuzzed hash / data_hash / record_type / branch
//!
//! # Invariants
//!
//! - NEVER panic on any body
//! - Exactly one item per capture, unsynced, with non-empty hash,
//!   record_type and branch
//! - A non-empty string `hash` field is kept verbatim

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use s4_core::offline::capture_anchor;
use serde_json::{Map, Value};

#[derive(Debug, Arbitrary)]
enum Body {
    Raw(Vec<u8>),
    Shaped {
        hash: Option<String>,
        data_hash: Option<String>,
        record_type: Option<String>,
        branch: Option<String>,
    },
    Missing,
}

fuzz_target!(|body: Body| {
    let timestamp = "2026-01-01T00:00:00.000Z";

    let (raw, expected_hash) = match body {
        Body::Raw(bytes) => (Some(bytes), None),
        Body::Shaped { hash, data_hash, record_type, branch } => {
            let mut fields = Map::new();
            for (key, value) in
                [("hash", &hash), ("data_hash", &data_hash), ("record_type", &record_type), ("branch", &branch)]
            {
                if let Some(value) = value {
                    fields.insert(key.to_string(), Value::String(value.clone()));
                }
            }
            let expected = hash.filter(|h| !h.is_empty());
            (Some(Value::Object(fields).to_string().into_bytes()), expected)
        },
        Body::Missing => (None, None),
    };

    let capture = capture_anchor(raw.as_deref(), timestamp);
    let item = capture.item;

    assert!(!item.hash.is_empty());
    assert!(!item.record_type.is_empty());
    assert!(!item.branch.is_empty());
    assert!(!item.synced);
    assert_eq!(item.timestamp, timestamp);
    if let Some(hash) = expected_hash {
        assert_eq!(item.hash, hash);
    }
});
