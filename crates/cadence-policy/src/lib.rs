//! # cadence-policy
//!
//! The pure decision layer of the Cadence engine: when an action may run,
//! whether today's quota admits it, how long to back off after a failure,
//! and the TOML settings that tune the loop.
//!
//! Nothing here performs I/O except [`EngineSettings::from_file`]. All
//! functions take the current time as an argument so they can be tested
//! against fixed instants.

pub mod limiter;
pub mod pacing;
pub mod retry;
pub mod settings;

pub use limiter::TokenBucketLimiter;
pub use pacing::{is_eligible, next_day_boundary, next_eligible_time, within_business_hours};
pub use retry::RetryPolicy;
pub use settings::{BurstSettings, EngineSettings, HumanizeSettings, LoopSettings};

// ── Tests ─────────────────────────────────────────────────────────────────────
