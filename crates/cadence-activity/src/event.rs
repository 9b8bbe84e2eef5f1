//! Chained activity records and the exported log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadence_contracts::activity::ActivityEntry;

/// One activity entry sealed into the hash chain.
///
/// Changing any field of `entry` invalidates `this_hash` and every later
/// `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedEntry {
    /// Position in the chain, starting at 0.
    pub sequence: u64,
    pub entry: ActivityEntry,
    /// `this_hash` of the previous record, or `GENESIS_HASH` for the first.
    pub prev_hash: String,
    pub this_hash: String,
}

impl ChainedEntry {
    /// `prev_hash` of the first record: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A snapshot of the whole chain, e.g. for an export endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub records: Vec<ChainedEntry>,
    pub exported_at: DateTime<Utc>,
    /// `this_hash` of the last record; empty when the log is empty.
    pub terminal_hash: String,
}

/// Dashboard counters folded from every recorded entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub total: u64,
    pub connections_sent: u64,
    pub messages_sent: u64,
    pub failures: u64,
    pub retries: u64,
    pub deferrals: u64,
}
