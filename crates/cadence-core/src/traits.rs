//! Collaborator traits for the Cadence engine.
//!
//! These four traits are the engine's only view of the outside world:
//!
//! - `Store`           : configuration, work source, and persistence
//! - `Actuator`        : the browser driver that performs an action
//! - `ActivityRecorder`: the append-only activity trail
//! - `Clock`           : the source of "now" for every scheduling decision
//!
//! The engine wraps every `Store` and `Actuator` call in a timeout, so
//! implementations need not enforce their own deadlines.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cadence_contracts::{
    action::{ActionOutcome, Dispatch, PendingAction},
    activity::ActivityEntry,
    error::CadenceResult,
    records::{CandidateQuery, EngineSnapshot},
    state::AutomationState,
};

/// The persistent store: configuration documents, the work queue, and the
/// records the dashboard reads.
///
/// Every method may fail with `CadenceError::StoreUnavailable`, which the
/// engine treats as transient.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load the rate-limit and stealth documents, the credential flag, and
    /// the active search criteria.
    async fn load_config(&self) -> CadenceResult<EngineSnapshot>;

    /// Hand out the next action to attempt, honouring `query.exclude_kinds`.
    ///
    /// An action returned here is owned by the engine from then on and must
    /// not be returned again.
    async fn next_candidate_action(&self, query: &CandidateQuery) -> CadenceResult<Option<PendingAction>>;

    /// Persist the result of one dispatch attempt.
    async fn record_outcome(&self, action: &PendingAction, outcome: &ActionOutcome) -> CadenceResult<()>;

    async fn append_activity_log(&self, entry: &ActivityEntry) -> CadenceResult<()>;

    async fn persist_state(&self, state: &AutomationState) -> CadenceResult<()>;

    /// The last persisted state, used to resume counters after a restart.
    async fn load_state(&self) -> CadenceResult<Option<AutomationState>>;

    /// Give back an action the daily quota could not admit. The store offers
    /// it again after the UTC day boundary.
    async fn defer_action(&self, action: &PendingAction) -> CadenceResult<()>;

    /// Give back an action the engine took but did not finish for some other
    /// reason (a shutdown while it was held or waiting out a retry). The
    /// store may offer it again immediately.
    async fn release_action(&self, action: &PendingAction) -> CadenceResult<()>;
}

/// The browser-automation driver.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Perform one action.
    ///
    /// Failures are reported either as `Err` (classified via
    /// `CadenceError::kind`) or as an `ActionOutcome` with `success = false`.
    /// `AuthenticationRejected` halts the engine; every other kind is retried.
    async fn perform(&self, dispatch: &Dispatch) -> CadenceResult<ActionOutcome>;
}

/// Sink for activity entries.
///
/// Called synchronously from the engine actor, so implementations must not
/// block for long.
pub trait ActivityRecorder: Send + Sync {
    fn record(&self, entry: &ActivityEntry) -> CadenceResult<()>;
}

/// Source of the current time for scheduling decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
