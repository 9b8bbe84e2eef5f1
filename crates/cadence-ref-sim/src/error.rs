//! Errors raised by the reference scenarios.

use thiserror::Error;

use cadence_contracts::error::CadenceError;

#[derive(Debug, Error)]
pub enum ScenarioError {
    /// An engine or store call failed.
    #[error(transparent)]
    Cadence(#[from] CadenceError),

    /// The run finished but did not behave as the scenario expects.
    #[error("scenario expectation failed: {reason}")]
    Expectation { reason: String },

    /// A condition the scenario waits for never became true.
    #[error("timed out after {after_ms}ms waiting for {what}")]
    WaitTimedOut { what: String, after_ms: u64 },
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Fail the scenario with `reason` unless `condition` holds.
pub fn ensure(condition: bool, reason: impl Into<String>) -> ScenarioResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ScenarioError::Expectation { reason: reason.into() })
    }
}
