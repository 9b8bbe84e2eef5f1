//! The engine's observable run state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of the automation engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Error,
}

impl fmt::Display for AutomationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AutomationStatus::Idle => "idle",
            AutomationStatus::Running => "running",
            AutomationStatus::Paused => "paused",
            AutomationStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Commands accepted by the lifecycle state machine.
///
/// `Fault` is never issued by callers; the action loop raises it when it
/// hits an unrecoverable failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleCommand {
    Start,
    Stop,
    Pause,
    Resume,
    Fault { reason: String },
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleCommand::Start => f.write_str("start"),
            LifecycleCommand::Stop => f.write_str("stop"),
            LifecycleCommand::Pause => f.write_str("pause"),
            LifecycleCommand::Resume => f.write_str("resume"),
            LifecycleCommand::Fault { .. } => f.write_str("fault"),
        }
    }
}

/// Singleton run-state document.
///
/// Written only by the engine actor. Everyone else holds a snapshot copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationState {
    pub status: AutomationStatus,
    /// What the loop is doing right now, for the dashboard.
    pub current_task: Option<String>,
    pub connections_today: u32,
    pub messages_today: u32,
    pub last_action_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl AutomationState {
    /// Document id used by the store for the singleton record.
    pub const DOCUMENT_ID: &'static str = "automation_state";
}
