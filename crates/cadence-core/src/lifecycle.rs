//! The automation lifecycle as a pure transition function.
//!
//! ```text
//!            Start (credentials)            Pause
//!   Idle ───────────────────────▶ Running ───────▶ Paused
//!    ▲  ▲                          │  ▲  ◀─────────  │
//!    │  └──────── Stop ────────────┘  │    Resume    │
//!    │                                │              │
//!    └──────────────── Stop ──────────┼──────────────┘
//!                                     │
//!   Error ─── Start (credentials) ────┘
//!     ▲
//!     └── Fault (from Running or Paused)
//! ```
//!
//! Side effects (activity entries, persistence, halting the loop) are the
//! engine's job; this module only decides.

use thiserror::Error;

use cadence_contracts::{
    error::CadenceError,
    state::{AutomationStatus, LifecycleCommand},
};

/// What applying a command does to the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status changes; the engine must log and persist.
    To(AutomationStatus),
    /// Idempotent no-op; the caller gets the current snapshot back.
    Stay,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot start without configured credentials")]
    ConfigurationMissing,

    #[error("cannot {command} while {from}")]
    Invalid { from: AutomationStatus, command: String },
}

impl From<TransitionError> for CadenceError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::ConfigurationMissing => CadenceError::ConfigurationMissing,
            TransitionError::Invalid { from, command } => CadenceError::InvalidTransition {
                from: from.to_string(),
                command,
            },
        }
    }
}

/// Decide the effect of `command` on `current`.
///
/// `credentials_configured` is only consulted for `Start` from `Idle` or
/// `Error`.
pub fn transition(
    current: AutomationStatus,
    command: &LifecycleCommand,
    credentials_configured: bool,
) -> Result<Transition, TransitionError> {
    use AutomationStatus::*;

    match (current, command) {
        (Idle | Error, LifecycleCommand::Start) => {
            if credentials_configured {
                Ok(Transition::To(Running))
            } else {
                Err(TransitionError::ConfigurationMissing)
            }
        }
        (Running | Paused, LifecycleCommand::Start) => Ok(Transition::Stay),
        (Running, LifecycleCommand::Pause) => Ok(Transition::To(Paused)),
        (Paused, LifecycleCommand::Resume) => Ok(Transition::To(Running)),
        (Running | Paused, LifecycleCommand::Stop) => Ok(Transition::To(Idle)),
        (Idle | Error, LifecycleCommand::Stop) => Ok(Transition::Stay),
        (Running | Paused, LifecycleCommand::Fault { .. }) => Ok(Transition::To(Error)),
        _ => Err(TransitionError::Invalid {
            from: current,
            command: command.to_string(),
        }),
    }
}
