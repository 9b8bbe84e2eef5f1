//! # cadence-activity
//!
//! Append-only activity trail for the Cadence engine.
//!
//! Every entry the engine records is wrapped in a [`ChainedEntry`] that links
//! to its predecessor by SHA-256 hash, so edits to past entries are
//! detectable with [`verify_chain`]. The recorder also keeps running counters
//! for the dashboard.
//!
//! ```rust,ignore
//! use cadence_activity::InMemoryActivityRecorder;
//!
//! let recorder = InMemoryActivityRecorder::new();
//! // hand `Arc::new(recorder.clone())` to the engine ...
//! assert!(recorder.verify_integrity());
//! let summary = recorder.summary();
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{hash_entry, verify_chain};
pub use event::{ActivityLog, ActivitySummary, ChainedEntry};
pub use memory::InMemoryActivityRecorder;

// ── Tests ─────────────────────────────────────────────────────────────────────
