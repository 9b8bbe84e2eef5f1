//! Store-side records the engine reads.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    action::ActionKind,
    config::{RateLimitConfig, StealthConfig},
    error::{CadenceError, CadenceResult},
};

/// A saved prospect search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    pub id: String,
    pub name: String,
    pub job_titles: Vec<String>,
    pub companies: Vec<String>,
    pub locations: Vec<String>,
    pub keywords: Vec<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Connection,
    FollowUp,
}

impl TemplateType {
    /// The template type used for the given action kind.
    pub fn for_action(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Connect => TemplateType::Connection,
            ActionKind::FollowUp => TemplateType::FollowUp,
        }
    }
}

/// A connection-note or follow-up message template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: String,
    pub name: String,
    pub template_type: TemplateType,
    /// Body with `{{firstName}}`-style placeholders.
    pub content: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Everything the engine loads from the store for one scheduling decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub rate_limits: RateLimitConfig,
    pub stealth: StealthConfig,
    pub credentials_configured: bool,
    pub active_search_criteria: Vec<SearchCriteria>,
}

impl EngineSnapshot {
    /// Validate both configuration documents and their interplay.
    pub fn validate(&self) -> CadenceResult<()> {
        self.rate_limits.validate()?;
        self.stealth.validate()?;
        if let Some((lunch_start, lunch_end)) = self.stealth.lunch_break() {
            if self.stealth.respect_business_hours
                && lunch_start <= self.rate_limits.business_hours_start
                && lunch_end >= self.rate_limits.business_hours_end
            {
                return Err(CadenceError::ConfigError {
                    reason: "lunch break covers the entire business-hours window".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Filter passed to the work source when asking for the next candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateQuery {
    pub active_search_criteria: Vec<SearchCriteria>,
    /// Kinds whose daily quota is spent; the store should not offer them.
    pub exclude_kinds: HashSet<ActionKind>,
}

impl CandidateQuery {
    pub fn allows(&self, kind: ActionKind) -> bool {
        !self.exclude_kinds.contains(&kind)
    }
}
