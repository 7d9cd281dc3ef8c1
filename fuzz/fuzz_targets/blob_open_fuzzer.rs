//! Fuzz target for opening stored queue blobs
//!
//! The encrypted queue slot is attacker-writable by anyone with access to
//! the storage namespace.
//!
//! # Invariants
//!
//! - Parsing and opening arbitrary blobs NEVER panics
//! - Tampered ciphertext is rejected, never decrypted to garbage
//! - A genuine seal of fuzzed plaintext opens to the same bytes

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use s4_crypto::{EncryptedBlob, QueueKey, open, seal};

#[derive(Debug, Arbitrary)]
struct Input {
    key: [u8; 32],
    iv: [u8; 12],
    plaintext: Vec<u8>,
    flip_at: usize,
    raw_blob: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let key = QueueKey::from_bytes(input.key);

    if let Ok(blob) = serde_json::from_slice::<EncryptedBlob>(&input.raw_blob) {
        let _ = open(&key, &blob);
    }

    let Ok(sealed) = seal(&key, &input.plaintext, input.iv) else {
        return;
    };
    assert_eq!(open(&key, &sealed).as_deref(), Ok(input.plaintext.as_slice()));

    let mut tampered = sealed.clone();
    let index = input.flip_at % tampered.data.len();
    tampered.data[index] ^= 0x01;
    assert!(open(&key, &tampered).is_err());
});
