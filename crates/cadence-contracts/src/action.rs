//! Work items and dispatch results.
//!
//! A `PendingAction` is produced by the work source (the store) and consumed
//! exactly once by the action loop. Each dispatch attempt yields one
//! `ActionOutcome`, which is written through to the activity log and folded
//! into the day counters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{config::StealthConfig, profile::InteractionProfile};

/// The two outbound operations the engine performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Send a connection request to a profile.
    Connect,
    /// Send a follow-up message to an accepted connection.
    FollowUp,
}

impl ActionKind {
    pub const ALL: [ActionKind; 2] = [ActionKind::Connect, ActionKind::FollowUp];
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Connect => f.write_str("connect"),
            ActionKind::FollowUp => f.write_str("follow_up"),
        }
    }
}

/// An ephemeral unit of work handed to the action loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Stable identifier assigned by the work source.
    pub id: String,
    pub kind: ActionKind,
    /// Profile URL for `Connect`, connection id for `FollowUp`.
    pub target: String,
    /// Template the actuator should render, if any.
    pub template_id: Option<String>,
    /// Dispatch attempts already made for this action (0 before the first).
    #[serde(default)]
    pub attempt: u32,
}

impl PendingAction {
    /// Build a fresh action with a random id and no attempts.
    pub fn new(kind: ActionKind, target: impl Into<String>, template_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            target: target.into(),
            template_id,
            attempt: 0,
        }
    }
}

/// Classification of a failed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    StoreUnavailable,
    TargetUnavailable,
    RateLimitedByPlatform,
    Timeout,
    AuthenticationRejected,
    Unclassified,
    /// The engine was stopped while the dispatch was in flight.
    Cancelled,
}

impl ActionErrorKind {
    /// Transient failures are retried with backoff at the action level.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ActionErrorKind::AuthenticationRejected | ActionErrorKind::Cancelled)
    }

    /// Fatal failures halt the engine immediately.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActionErrorKind::AuthenticationRejected)
    }
}

/// The result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub error_kind: Option<ActionErrorKind>,
    /// Human-readable failure detail, absent on success.
    #[serde(default)]
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ActionOutcome {
    pub fn succeeded(timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            error_kind: None,
            error_message: None,
            timestamp,
        }
    }

    pub fn failed(kind: ActionErrorKind, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: false,
            error_kind: Some(kind),
            error_message: Some(message.into()),
            timestamp,
        }
    }
}

/// Everything the actuator receives for one dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispatch {
    pub action: PendingAction,
    /// Snapshot of the stealth parameters at decision time.
    pub stealth: StealthConfig,
    /// Sampled timing profile the driver should replay.
    pub profile: InteractionProfile,
}
