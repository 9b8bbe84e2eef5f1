//! Hash-chain primitives for the activity log.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. canonical JSON of the entry (serde_json, compact)

use sha2::{Digest, Sha256};

use cadence_contracts::activity::ActivityEntry;

use crate::event::ChainedEntry;

/// SHA-256 over (sequence, prev_hash, entry JSON), as lowercase hex.
///
/// # Panics
///
/// Panics if `entry` cannot be serialized to JSON, which cannot happen for
/// an `ActivityEntry` (its `details` are already a `serde_json::Value`).
pub fn hash_entry(sequence: u64, entry: &ActivityEntry, prev_hash: &str) -> String {
    let entry_json =
        serde_json::to_vec(entry).expect("ActivityEntry must always be serializable to JSON");

    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&entry_json);

    hex::encode(hasher.finalize())
}

/// Check prev-hash linkage and recompute every hash. An empty chain is valid.
pub fn verify_chain(records: &[ChainedEntry]) -> bool {
    let mut expected_prev = ChainedEntry::GENESIS_HASH.to_string();

    for (position, record) in records.iter().enumerate() {
        if record.sequence != position as u64 || record.prev_hash != expected_prev {
            return false;
        }
        if record.this_hash != hash_entry(record.sequence, &record.entry, &record.prev_hash) {
            return false;
        }
        expected_prev = record.this_hash.clone();
    }

    true
}
