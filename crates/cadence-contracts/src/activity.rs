//! Activity log entries.
//!
//! Every lifecycle transition and every dispatch attempt, successful or not,
//! produces exactly one `ActivityEntry`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Lifecycle,
    Connect,
    Message,
    Deferred,
    Retry,
    Config,
    Error,
}

/// How the recorded event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Success,
    Failure,
    Warning,
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    pub action_type: ActivityKind,
    pub description: String,
    /// Structured context (action id, target, error kind, …).
    pub details: Value,
    pub status: ActivityStatus,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(
        action_type: ActivityKind,
        status: ActivityStatus,
        description: impl Into<String>,
        details: Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action_type,
            description: description.into(),
            details,
            status,
            timestamp,
        }
    }
}
