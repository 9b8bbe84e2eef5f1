//! In-memory implementation of `ActivityRecorder`.
//!
//! Entries live in a `Vec` behind a `Mutex`. Clones share the same chain, so
//! the demo can hand one clone to the engine and keep another for reading.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::debug;

use cadence_contracts::{
    activity::{ActivityEntry, ActivityKind, ActivityStatus},
    error::{CadenceError, CadenceResult},
};
use cadence_core::traits::ActivityRecorder;

use crate::{
    chain::{hash_entry, verify_chain},
    event::{ActivityLog, ActivitySummary, ChainedEntry},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct ChainState {
    pub(crate) records: Vec<ChainedEntry>,
    pub(crate) last_hash: String,
    pub(crate) summary: ActivitySummary,
}

// ── Public recorder ───────────────────────────────────────────────────────────

/// Append-only activity recorder backed by a SHA-256 hash chain.
#[derive(Clone)]
pub struct InMemoryActivityRecorder {
    pub(crate) state: Arc<Mutex<ChainState>>,
}

impl Default for InMemoryActivityRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryActivityRecorder {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState {
                records: Vec::new(),
                last_hash: ChainedEntry::GENESIS_HASH.to_string(),
                summary: ActivitySummary::default(),
            })),
        }
    }

    /// Export every record written so far.
    pub fn export_log(&self) -> ActivityLog {
        let state = self.state.lock().expect("activity state lock poisoned");
        ActivityLog {
            records: state.records.clone(),
            exported_at: Utc::now(),
            terminal_hash: state
                .records
                .last()
                .map(|r| r.this_hash.clone())
                .unwrap_or_default(),
        }
    }

    /// Confirm the in-memory chain has not been altered.
    pub fn verify_integrity(&self) -> bool {
        let state = self.state.lock().expect("activity state lock poisoned");
        verify_chain(&state.records)
    }

    /// The newest `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        let state = self.state.lock().expect("activity state lock poisoned");
        state
            .records
            .iter()
            .rev()
            .take(limit)
            .map(|r| r.entry.clone())
            .collect()
    }

    /// Entries of one kind, oldest first.
    pub fn entries_of(&self, kind: ActivityKind) -> Vec<ActivityEntry> {
        let state = self.state.lock().expect("activity state lock poisoned");
        state
            .records
            .iter()
            .filter(|r| r.entry.action_type == kind)
            .map(|r| r.entry.clone())
            .collect()
    }

    pub fn summary(&self) -> ActivitySummary {
        self.state.lock().expect("activity state lock poisoned").summary
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("activity state lock poisoned").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn fold(summary: &mut ActivitySummary, entry: &ActivityEntry) {
    summary.total += 1;
    match (entry.action_type, entry.status) {
        (ActivityKind::Connect, ActivityStatus::Success) => summary.connections_sent += 1,
        (ActivityKind::Message, ActivityStatus::Success) => summary.messages_sent += 1,
        (ActivityKind::Retry, _) => summary.retries += 1,
        (_, ActivityStatus::Deferred) => summary.deferrals += 1,
        (_, ActivityStatus::Failure) => summary.failures += 1,
        _ => {}
    }
}

// ── ActivityRecorder impl ─────────────────────────────────────────────────────

impl ActivityRecorder for InMemoryActivityRecorder {
    /// Append one entry to the chain and fold it into the counters.
    fn record(&self, entry: &ActivityEntry) -> CadenceResult<()> {
        let mut state = self.state.lock().map_err(|e| CadenceError::StoreUnavailable {
            reason: format!("activity state lock poisoned: {}", e),
        })?;

        let sequence = state.records.len() as u64;
        let prev_hash = state.last_hash.clone();
        let this_hash = hash_entry(sequence, entry, &prev_hash);

        state.records.push(ChainedEntry {
            sequence,
            entry: entry.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.last_hash = this_hash;
        fold(&mut state.summary, entry);

        debug!(
            sequence,
            action_type = ?entry.action_type,
            status = ?entry.status,
            "activity recorded"
        );
        Ok(())
    }
}
