//! Error types for the Cadence engine.
//!
//! All fallible operations return `CadenceResult<T>`. The variants double as
//! the failure taxonomy the action loop classifies on: see
//! [`CadenceError::kind`] for the mapping onto [`ActionErrorKind`].

use thiserror::Error;

use crate::action::ActionErrorKind;

/// The unified error type for the Cadence engine and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CadenceError {
    /// Start was requested but no LinkedIn credentials are stored.
    #[error("configuration missing: linkedin credentials are not configured")]
    ConfigurationMissing,

    /// A lifecycle command does not apply to the current status.
    #[error("invalid transition: cannot {command} while {from}")]
    InvalidTransition { from: String, command: String },

    /// The persistent store could not be reached or rejected the call.
    #[error("store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// The target profile or connection could not be acted on right now.
    #[error("target unavailable: {reason}")]
    TargetUnavailable { reason: String },

    /// The platform throttled the session.
    #[error("rate limited by platform: {reason}")]
    RateLimitedByPlatform { reason: String },

    /// The platform rejected the session credentials.
    #[error("authentication rejected: {reason}")]
    AuthenticationRejected { reason: String },

    /// A collaborator call did not finish within its deadline.
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// An actuator failure that fits no other category.
    #[error("actuator error: {reason}")]
    Actuator { reason: String },

    /// A configuration document or settings file is malformed or inconsistent.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A message template has invalid placeholders or cannot be rendered.
    #[error("template error: {reason}")]
    TemplateError { reason: String },

    /// The engine actor has shut down and can no longer accept commands.
    #[error("engine unavailable: the automation engine has shut down")]
    EngineUnavailable,
}

impl CadenceError {
    /// Classify this error for an [`crate::action::ActionOutcome`].
    ///
    /// Configuration and template problems surfaced during a dispatch are
    /// treated as unclassified actuator failures: they are retried under the
    /// normal budget and then counted as failed actions.
    pub fn kind(&self) -> ActionErrorKind {
        match self {
            CadenceError::StoreUnavailable { .. } => ActionErrorKind::StoreUnavailable,
            CadenceError::TargetUnavailable { .. } => ActionErrorKind::TargetUnavailable,
            CadenceError::RateLimitedByPlatform { .. } => ActionErrorKind::RateLimitedByPlatform,
            CadenceError::AuthenticationRejected { .. } => ActionErrorKind::AuthenticationRejected,
            CadenceError::Timeout { .. } => ActionErrorKind::Timeout,
            CadenceError::ConfigurationMissing
            | CadenceError::InvalidTransition { .. }
            | CadenceError::Actuator { .. }
            | CadenceError::ConfigError { .. }
            | CadenceError::TemplateError { .. }
            | CadenceError::EngineUnavailable => ActionErrorKind::Unclassified,
        }
    }
}

/// Convenience alias used throughout the Cadence crates.
pub type CadenceResult<T> = Result<T, CadenceError>;
