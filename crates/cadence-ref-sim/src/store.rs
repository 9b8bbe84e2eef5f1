//! In-memory implementation of the engine's `Store`.
//!
//! Plays the part of the dashboard database: it owns the rate-limit and
//! stealth documents, turns search results and accepted connections into
//! candidate actions, and keeps the connection, message, outcome and
//! activity records the engine writes back.
//!
//! Candidates are offered in this order:
//!
//! 1. actions the engine released unfinished at shutdown,
//! 2. deferred actions whose release time (the next UTC midnight after
//!    deferral) has passed,
//! 3. connection requests to prospects matched by an active search,
//! 4. follow-ups to accepted connections that have not had one.
//!
//! Kinds listed in `CandidateQuery::exclude_kinds` are skipped at every step.
//! A target is handed out at most once; only `release_action` and
//! `defer_action` put it back.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cadence_contracts::{
    action::{ActionKind, ActionOutcome, PendingAction},
    activity::ActivityEntry,
    config::{RateLimitConfig, StealthConfig},
    error::{CadenceError, CadenceResult},
    records::{CandidateQuery, EngineSnapshot, MessageTemplate, SearchCriteria, TemplateType},
    state::AutomationState,
};
use cadence_core::{Clock, Store};
use cadence_policy::pacing::next_day_boundary;

use crate::mock_data::{self, Prospect};

// ── Configuration document ────────────────────────────────────────────────────

/// The store-owned documents, loadable from the `[rate_limits]` and
/// `[stealth]` tables of a TOML file. Other tables are ignored, so the same
/// file can carry the engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub rate_limits: RateLimitConfig,
    pub stealth: StealthConfig,
    /// Whether LinkedIn credentials have been saved.
    pub credentials_configured: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            rate_limits: RateLimitConfig::default(),
            stealth: StealthConfig::default(),
            credentials_configured: true,
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(s: &str) -> CadenceResult<Self> {
        let config: StoreConfig = toml::from_str(s).map_err(|e| CadenceError::ConfigError {
            reason: format!("failed to parse store configuration TOML: {}", e),
        })?;
        config.rate_limits.validate()?;
        config.stealth.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> CadenceResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CadenceError::ConfigError {
            reason: format!("failed to read store configuration file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Declined,
}

/// A connection request that went out, or one accepted before the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: String,
    pub prospect: Prospect,
    pub status: ConnectionStatus,
    pub template_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub follow_up_sent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub connection_id: String,
    pub template_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct DeferredEntry {
    action: PendingAction,
    release_at: DateTime<Utc>,
}

// ── InMemoryStore ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct StoreInner {
    config: StoreConfig,
    criteria: Vec<SearchCriteria>,
    templates: Vec<MessageTemplate>,
    prospects: Vec<Prospect>,
    connections: Vec<ConnectionRecord>,
    messages: Vec<MessageRecord>,
    /// Targets handed to the engine and not given back.
    handed_out: HashSet<String>,
    released: VecDeque<PendingAction>,
    deferred: Vec<DeferredEntry>,
    outcomes: Vec<(PendingAction, ActionOutcome)>,
    activity: Vec<ActivityEntry>,
    state: Option<AutomationState>,
    /// Number of upcoming calls that fail with `StoreUnavailable`.
    failing_calls: u32,
    /// Round-robin cursor per template type.
    template_cursor: [usize; 2],
}

/// Thread-safe in-memory store. Clones share the same data.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Mutex<StoreInner>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    /// An empty store: no prospects, searches, templates or connections.
    pub fn new(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                config,
                ..StoreInner::default()
            })),
            clock,
        }
    }

    /// A store seeded with the fictional data in [`mock_data`].
    pub fn with_mock_data(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Self::new(config, clock);
        {
            let mut inner = store.lock();
            inner.criteria = mock_data::search_criteria();
            inner.templates = mock_data::templates();
            inner.prospects = mock_data::prospects();
            inner.connections = mock_data::accepted_connections()
                .into_iter()
                .map(|(id, prospect, accepted_at)| ConnectionRecord {
                    id,
                    prospect,
                    status: ConnectionStatus::Accepted,
                    template_id: None,
                    created_at: accepted_at,
                    accepted_at: Some(accepted_at),
                    follow_up_sent: false,
                })
                .collect();
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("store lock poisoned")
    }

    fn check_available(&self, inner: &mut StoreInner, operation: &str) -> CadenceResult<()> {
        if inner.failing_calls > 0 {
            inner.failing_calls -= 1;
            warn!(operation, remaining = inner.failing_calls, "simulated store outage");
            return Err(CadenceError::StoreUnavailable {
                reason: format!("{operation}: simulated outage"),
            });
        }
        Ok(())
    }

    // ── Dashboard-side edits ──────────────────────────────────────────────────

    pub fn set_rate_limits(&self, rate_limits: RateLimitConfig) {
        self.lock().config.rate_limits = rate_limits;
    }

    pub fn set_stealth(&self, stealth: StealthConfig) {
        self.lock().config.stealth = stealth;
    }

    pub fn set_credentials_configured(&self, configured: bool) {
        self.lock().config.credentials_configured = configured;
    }

    /// Fail the next `calls` store calls with `StoreUnavailable`.
    pub fn fail_next_calls(&self, calls: u32) {
        self.lock().failing_calls = calls;
    }

    /// Mark a pending connection request as accepted, making it eligible for
    /// a follow-up. Returns false if no pending request targets `profile_url`.
    pub fn accept_connection(&self, profile_url: &str) -> bool {
        let now = self.clock.now();
        let mut inner = self.lock();
        match inner
            .connections
            .iter_mut()
            .find(|c| c.prospect.profile_url == profile_url && c.status == ConnectionStatus::Pending)
        {
            Some(connection) => {
                connection.status = ConnectionStatus::Accepted;
                connection.accepted_at = Some(now);
                debug!(connection_id = %connection.id, "connection accepted");
                true
            }
            None => false,
        }
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    /// The prospect an action targets: a profile URL for connects, a
    /// connection id for follow-ups.
    pub fn prospect_for(&self, action: &PendingAction) -> Option<Prospect> {
        let inner = self.lock();
        match action.kind {
            ActionKind::Connect => inner
                .prospects
                .iter()
                .find(|p| p.profile_url == action.target)
                .cloned(),
            ActionKind::FollowUp => inner
                .connections
                .iter()
                .find(|c| c.id == action.target)
                .map(|c| c.prospect.clone()),
        }
    }

    pub fn templates(&self) -> Vec<MessageTemplate> {
        self.lock().templates.clone()
    }

    pub fn connections(&self) -> Vec<ConnectionRecord> {
        self.lock().connections.clone()
    }

    pub fn messages(&self) -> Vec<MessageRecord> {
        self.lock().messages.clone()
    }

    pub fn outcomes(&self) -> Vec<(PendingAction, ActionOutcome)> {
        self.lock().outcomes.clone()
    }

    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.lock().activity.clone()
    }

    pub fn saved_state(&self) -> Option<AutomationState> {
        self.lock().state.clone()
    }

    pub fn deferred_actions(&self) -> Vec<PendingAction> {
        self.lock().deferred.iter().map(|d| d.action.clone()).collect()
    }

    pub fn released_actions(&self) -> Vec<PendingAction> {
        self.lock().released.iter().cloned().collect()
    }
}

impl StoreInner {
    fn next_template(&mut self, template_type: TemplateType) -> Option<String> {
        let slot = match template_type {
            TemplateType::Connection => 0,
            TemplateType::FollowUp => 1,
        };
        let active: Vec<&MessageTemplate> = self
            .templates
            .iter()
            .filter(|t| t.is_active && t.template_type == template_type)
            .collect();
        if active.is_empty() {
            return None;
        }
        let pick = active[self.template_cursor[slot] % active.len()].id.clone();
        self.template_cursor[slot] += 1;
        Some(pick)
    }

    fn take_released(&mut self, query: &CandidateQuery) -> Option<PendingAction> {
        let idx = self.released.iter().position(|a| query.allows(a.kind))?;
        self.released.remove(idx)
    }

    fn take_deferred(&mut self, now: DateTime<Utc>, query: &CandidateQuery) -> Option<PendingAction> {
        let idx = self
            .deferred
            .iter()
            .position(|d| d.release_at <= now && query.allows(d.action.kind))?;
        Some(self.deferred.remove(idx).action)
    }

    fn next_connect(&mut self, query: &CandidateQuery) -> Option<PendingAction> {
        if !query.allows(ActionKind::Connect) {
            return None;
        }
        let connected: HashSet<&str> = self
            .connections
            .iter()
            .map(|c| c.prospect.profile_url.as_str())
            .collect();
        let target = self
            .prospects
            .iter()
            .filter(|p| !connected.contains(p.profile_url.as_str()) && !self.handed_out.contains(&p.profile_url))
            .find(|p| query.active_search_criteria.iter().any(|c| c.is_active && p.matches(c)))
            .map(|p| p.profile_url.clone())?;
        let template_id = self.next_template(TemplateType::Connection);
        self.handed_out.insert(target.clone());
        Some(PendingAction::new(ActionKind::Connect, target, template_id))
    }

    fn next_follow_up(&mut self, query: &CandidateQuery) -> Option<PendingAction> {
        if !query.allows(ActionKind::FollowUp) {
            return None;
        }
        let target = self
            .connections
            .iter()
            .find(|c| {
                c.status == ConnectionStatus::Accepted && !c.follow_up_sent && !self.handed_out.contains(&c.id)
            })
            .map(|c| c.id.clone())?;
        let template_id = self.next_template(TemplateType::FollowUp);
        self.handed_out.insert(target.clone());
        Some(PendingAction::new(ActionKind::FollowUp, target, template_id))
    }

    fn apply_success(&mut self, action: &PendingAction, at: DateTime<Utc>) {
        match action.kind {
            ActionKind::Connect => {
                let Some(prospect) = self.prospects.iter().find(|p| p.profile_url == action.target).cloned() else {
                    warn!(target = %action.target, "connect outcome for unknown prospect");
                    return;
                };
                self.connections.push(ConnectionRecord {
                    id: uuid::Uuid::new_v4().to_string(),
                    prospect,
                    status: ConnectionStatus::Pending,
                    template_id: action.template_id.clone(),
                    created_at: at,
                    accepted_at: None,
                    follow_up_sent: false,
                });
            }
            ActionKind::FollowUp => {
                if let Some(connection) = self.connections.iter_mut().find(|c| c.id == action.target) {
                    connection.follow_up_sent = true;
                }
                self.messages.push(MessageRecord {
                    id: uuid::Uuid::new_v4().to_string(),
                    connection_id: action.target.clone(),
                    template_id: action.template_id.clone(),
                    sent_at: at,
                });
            }
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn load_config(&self) -> CadenceResult<EngineSnapshot> {
        let mut inner = self.lock();
        self.check_available(&mut inner, "load_config")?;
        Ok(EngineSnapshot {
            rate_limits: inner.config.rate_limits.clone(),
            stealth: inner.config.stealth.clone(),
            credentials_configured: inner.config.credentials_configured,
            active_search_criteria: inner.criteria.iter().filter(|c| c.is_active).cloned().collect(),
        })
    }

    async fn next_candidate_action(&self, query: &CandidateQuery) -> CadenceResult<Option<PendingAction>> {
        let now = self.clock.now();
        let mut inner = self.lock();
        self.check_available(&mut inner, "next_candidate_action")?;
        let action = inner
            .take_released(query)
            .or_else(|| inner.take_deferred(now, query))
            .or_else(|| inner.next_connect(query))
            .or_else(|| inner.next_follow_up(query));
        if let Some(action) = &action {
            debug!(action_id = %action.id, kind = %action.kind, target = %action.target, "candidate handed out");
        }
        Ok(action)
    }

    async fn record_outcome(&self, action: &PendingAction, outcome: &ActionOutcome) -> CadenceResult<()> {
        let mut inner = self.lock();
        self.check_available(&mut inner, "record_outcome")?;
        if outcome.success {
            inner.apply_success(action, outcome.timestamp);
        }
        inner.outcomes.push((action.clone(), outcome.clone()));
        Ok(())
    }

    async fn append_activity_log(&self, entry: &ActivityEntry) -> CadenceResult<()> {
        let mut inner = self.lock();
        self.check_available(&mut inner, "append_activity_log")?;
        inner.activity.push(entry.clone());
        Ok(())
    }

    async fn persist_state(&self, state: &AutomationState) -> CadenceResult<()> {
        let mut inner = self.lock();
        self.check_available(&mut inner, "persist_state")?;
        inner.state = Some(state.clone());
        Ok(())
    }

    async fn load_state(&self) -> CadenceResult<Option<AutomationState>> {
        let mut inner = self.lock();
        self.check_available(&mut inner, "load_state")?;
        Ok(inner.state.clone())
    }

    async fn defer_action(&self, action: &PendingAction) -> CadenceResult<()> {
        let release_at = next_day_boundary(self.clock.now());
        let mut inner = self.lock();
        self.check_available(&mut inner, "defer_action")?;
        info!(action_id = %action.id, release_at = %release_at, "action deferred");
        inner.deferred.push(DeferredEntry {
            action: action.clone(),
            release_at,
        });
        Ok(())
    }

    async fn release_action(&self, action: &PendingAction) -> CadenceResult<()> {
        let mut inner = self.lock();
        self.check_available(&mut inner, "release_action")?;
        debug!(action_id = %action.id, "action released");
        inner.released.push_back(action.clone());
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
