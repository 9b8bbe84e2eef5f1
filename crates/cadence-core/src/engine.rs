//! The Cadence engine: command surface plus the action loop actor.
//!
//! One tokio task owns the `AutomationState`, the quota limiter, the
//! humanization sampler, and the retry queue. Callers talk to it through an
//! [`Engine`] handle: lifecycle commands travel over an `mpsc` channel with a
//! `oneshot` reply, and state snapshots are published on a `watch` channel so
//! reading the state never waits on the loop.
//!
//! Each loop iteration handles at most one candidate action:
//!
//!   roll day → load config → pick candidate → pacing → quota → burst
//!     → humanization wait → re-check hours → dispatch → record
//!
//! Every wait along the way also listens on the command channel, so Stop
//! and Pause take effect immediately. A candidate interrupted before its
//! dispatch is held at the front of the queue; a dispatch already in flight
//! finishes before a Pause is honoured.
//!
//! Outcomes the store fails to accept are kept by the actor and written again
//! under the retry backoff at the top of later iterations. The action itself
//! is never dispatched twice.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cadence_contracts::{
    action::{ActionErrorKind, ActionKind, ActionOutcome, Dispatch, PendingAction},
    activity::{ActivityEntry, ActivityKind, ActivityStatus},
    error::{CadenceError, CadenceResult},
    records::{CandidateQuery, EngineSnapshot},
    state::{AutomationState, AutomationStatus, LifecycleCommand},
};
use cadence_humanize::HumanizationSampler;
use cadence_policy::{
    limiter::TokenBucketLimiter,
    pacing::{is_eligible, next_day_boundary, next_eligible_time, until},
    settings::EngineSettings,
};

use crate::{
    lifecycle::{transition, Transition},
    traits::{ActivityRecorder, Actuator, Clock, Store},
};

const COMMAND_BUFFER: usize = 32;

/// The collaborators an engine is built from.
#[derive(Clone)]
pub struct EngineDeps {
    pub store: Arc<dyn Store>,
    pub actuator: Arc<dyn Actuator>,
    pub recorder: Arc<dyn ActivityRecorder>,
    pub clock: Arc<dyn Clock>,
}

struct Command {
    kind: LifecycleCommand,
    reply: oneshot::Sender<CadenceResult<AutomationState>>,
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// Cloneable handle to a running engine actor.
///
/// Dropping every handle closes the command channel; the actor then halts
/// the loop and exits.
#[derive(Clone)]
pub struct Engine {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<AutomationState>,
    shutdown: CancellationToken,
}

impl Engine {
    /// Spawn the actor on the current tokio runtime.
    ///
    /// The actor first restores counters from `Store::load_state`, then waits
    /// in `Idle` (or `Error`, if that was the persisted status) for `start`.
    pub fn spawn(deps: EngineDeps, settings: EngineSettings) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(AutomationState::default());
        let shutdown = CancellationToken::new();

        let actor = Actor::new(deps, settings, command_rx, state_tx, shutdown.clone());
        tokio::spawn(actor.run());

        Self {
            commands: command_tx,
            state: state_rx,
            shutdown,
        }
    }

    /// Begin (or recover into) `Running`.
    ///
    /// Fails with `ConfigurationMissing` when no credentials are stored. A
    /// no-op when already running or paused.
    pub async fn start(&self) -> CadenceResult<AutomationState> {
        self.send(LifecycleCommand::Start).await
    }

    /// Halt the loop and return to `Idle`. In-flight waits and dispatches are
    /// cancelled before the reply is sent.
    pub async fn stop(&self) -> CadenceResult<AutomationState> {
        self.send(LifecycleCommand::Stop).await
    }

    /// Pause after the current dispatch, if any, has been recorded.
    pub async fn pause(&self) -> CadenceResult<AutomationState> {
        self.send(LifecycleCommand::Pause).await
    }

    pub async fn resume(&self) -> CadenceResult<AutomationState> {
        self.send(LifecycleCommand::Resume).await
    }

    /// The latest published snapshot. Never blocks.
    pub fn get_state(&self) -> AutomationState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<AutomationState> {
        self.state.clone()
    }

    /// Halt the loop, stop the actor, and wait for it to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.commands.closed().await;
    }

    async fn send(&self, kind: LifecycleCommand) -> CadenceResult<AutomationState> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command { kind, reply })
            .await
            .map_err(|_| CadenceError::EngineUnavailable)?;
        response.await.map_err(|_| CadenceError::EngineUnavailable)?
    }
}

// ── Actor ─────────────────────────────────────────────────────────────────────

/// An action waiting out its retry backoff.
struct RetryEntry {
    action: PendingAction,
    not_before: DateTime<Utc>,
    /// Held here because the store refused a quota deferral.
    quota_denied: bool,
}

/// A dispatch outcome the store has not accepted yet.
struct UnwrittenOutcome {
    action: PendingAction,
    outcome: ActionOutcome,
    attempts: u32,
    not_before: DateTime<Utc>,
}

/// How a wait ended.
enum Wake {
    Elapsed,
    /// A command moved the engine out of `Running`.
    Interrupted,
    Shutdown,
}

/// What the outer loop should do after an iteration.
enum Flow {
    Continue,
    Exit,
}

/// How a dispatch race ended.
enum DispatchEnd {
    Finished {
        result: Result<CadenceResult<ActionOutcome>, tokio::time::error::Elapsed>,
        deferred: Vec<Command>,
    },
    Stopped {
        stop: Command,
        deferred: Vec<Command>,
    },
    Shutdown,
}

struct Actor {
    deps: EngineDeps,
    settings: EngineSettings,
    commands: mpsc::Receiver<Command>,
    publisher: watch::Sender<AutomationState>,
    shutdown: CancellationToken,

    state: AutomationState,
    limiter: TokenBucketLimiter,
    sampler: HumanizationSampler,
    retries: VecDeque<RetryEntry>,
    unwritten: VecDeque<UnwrittenOutcome>,
    /// A candidate whose processing was interrupted; offered again first.
    held: Option<PendingAction>,
    consecutive_failed_actions: u32,
    cooldown_until: Option<DateTime<Utc>>,
}

impl Actor {
    fn new(
        deps: EngineDeps,
        settings: EngineSettings,
        commands: mpsc::Receiver<Command>,
        publisher: watch::Sender<AutomationState>,
        shutdown: CancellationToken,
    ) -> Self {
        let limiter = TokenBucketLimiter::new(settings.burst.burst_capacity);
        let sampler = HumanizationSampler::new(settings.humanize.clone());
        Self {
            deps,
            settings,
            commands,
            publisher,
            shutdown,
            state: AutomationState::default(),
            limiter,
            sampler,
            retries: VecDeque::new(),
            unwritten: VecDeque::new(),
            held: None,
            consecutive_failed_actions: 0,
            cooldown_until: None,
        }
    }

    async fn run(mut self) {
        self.restore().await;

        loop {
            if self.state.status != AutomationStatus::Running {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    cmd = self.commands.recv() => match cmd {
                        Some(cmd) => {
                            let result = self.apply(cmd.kind).await;
                            let _ = cmd.reply.send(result);
                        }
                        None => break,
                    },
                }
                continue;
            }

            if let Flow::Exit = self.iteration().await {
                break;
            }
        }

        self.halt().await;
    }

    // ── Startup and shutdown ──────────────────────────────────────────────────

    async fn restore(&mut self) {
        match self.store_call("load_state", self.deps.store.load_state()).await {
            Ok(Some(saved)) => {
                info!(
                    status = %saved.status,
                    connections_today = saved.connections_today,
                    messages_today = saved.messages_today,
                    "restoring persisted automation state"
                );
                self.limiter
                    .restore(saved.connections_today, saved.messages_today, saved.last_action_at);
                // A run interrupted by a restart comes back idle; an error stays
                // visible until someone starts again.
                let status = if saved.status == AutomationStatus::Error {
                    AutomationStatus::Error
                } else {
                    AutomationStatus::Idle
                };
                self.state = AutomationState {
                    status,
                    current_task: None,
                    started_at: None,
                    ..saved
                };
            }
            Ok(None) => debug!("no persisted automation state; starting fresh"),
            Err(err) => {
                self.record_failure_entry(ActivityKind::Error, "failed to load persisted state", &err)
                    .await
            }
        }

        self.limiter.roll_over(self.deps.clock.now());
        self.sync_counters();
        self.publish();
    }

    /// Leave `Running`/`Paused` and hand held work back to the store.
    async fn halt(&mut self) {
        if matches!(self.state.status, AutomationStatus::Running | AutomationStatus::Paused) {
            if let Err(err) = self.apply(LifecycleCommand::Stop).await {
                warn!(error = %err, "failed to stop engine during shutdown");
            }
        }

        // Last chance for outcomes the store refused earlier.
        for write in std::mem::take(&mut self.unwritten) {
            if let Err(err) = self
                .store_call("record_outcome", self.deps.store.record_outcome(&write.action, &write.outcome))
                .await
            {
                warn!(action_id = %write.action.id, attempts = write.attempts, error = %err, "outcome lost at shutdown");
            }
        }

        let mut leftovers: Vec<(PendingAction, bool)> =
            self.held.take().into_iter().map(|action| (action, false)).collect();
        leftovers.extend(self.retries.drain(..).map(|entry| (entry.action, entry.quota_denied)));
        for (action, quota_denied) in leftovers {
            let returned = if quota_denied {
                self.store_call("defer_action", self.deps.store.defer_action(&action)).await
            } else {
                self.store_call("release_action", self.deps.store.release_action(&action)).await
            };
            match returned {
                Ok(()) => debug!(action_id = %action.id, quota_denied, "returned held action to the store"),
                Err(err) => warn!(action_id = %action.id, error = %err, "held action could not be returned"),
            }
        }
        info!("engine actor exited");
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Apply a lifecycle command: decide, then log, persist, and publish.
    async fn apply(&mut self, command: LifecycleCommand) -> CadenceResult<AutomationState> {
        let from = self.state.status;
        let credentials = if matches!(command, LifecycleCommand::Start)
            && matches!(from, AutomationStatus::Idle | AutomationStatus::Error)
        {
            self.store_call("load_config", self.deps.store.load_config())
                .await?
                .credentials_configured
        } else {
            true
        };

        let next = match transition(from, &command, credentials) {
            Ok(Transition::To(next)) => next,
            Ok(Transition::Stay) => {
                debug!(status = %from, command = %command, "lifecycle command is a no-op");
                return Ok(self.state.clone());
            }
            Err(err) => {
                warn!(status = %from, command = %command, error = %err, "lifecycle command rejected");
                return Err(err.into());
            }
        };

        let now = self.deps.clock.now();
        let (description, status) = match &command {
            LifecycleCommand::Start => {
                self.state.started_at = Some(now);
                self.state.error_message = None;
                self.consecutive_failed_actions = 0;
                ("automation started".to_string(), ActivityStatus::Success)
            }
            LifecycleCommand::Stop => {
                self.state.started_at = None;
                ("automation stopped".to_string(), ActivityStatus::Success)
            }
            LifecycleCommand::Pause => ("automation paused".to_string(), ActivityStatus::Success),
            LifecycleCommand::Resume => ("automation resumed".to_string(), ActivityStatus::Success),
            LifecycleCommand::Fault { reason } => {
                self.state.error_message = Some(reason.clone());
                (format!("automation halted: {reason}"), ActivityStatus::Failure)
            }
        };
        self.state.status = next;
        self.state.current_task = None;

        info!(from = %from, to = %next, command = %command, "lifecycle transition");
        self.record_activity(ActivityEntry::new(
            ActivityKind::Lifecycle,
            status,
            description,
            json!({ "from": from, "to": next, "command": command.to_string() }),
            now,
        ))
        .await;
        self.persist().await;
        self.publish();
        Ok(self.state.clone())
    }

    async fn fault(&mut self, reason: String) {
        if let Err(err) = self.apply(LifecycleCommand::Fault { reason }).await {
            warn!(error = %err, "fault transition rejected");
        }
    }

    // ── One iteration ─────────────────────────────────────────────────────────

    async fn iteration(&mut self) -> Flow {
        let now = self.deps.clock.now();
        if self.limiter.roll_over(now) {
            self.sync_counters();
            self.persist().await;
            self.publish();
        }
        if !self.unwritten.is_empty() {
            self.flush_outcomes(now).await;
        }

        if let Some(cooldown_end) = self.cooldown_until {
            if now < cooldown_end {
                self.set_task("cooling down");
                return self.wait_chunk(until(now, cooldown_end)).await;
            }
            self.cooldown_until = None;
        }

        let snapshot = match self.store_call("load_config", self.deps.store.load_config()).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.record_failure_entry(ActivityKind::Config, "failed to load configuration", &err)
                    .await;
                return self.wait_chunk(self.settings.engine.poll_interval()).await;
            }
        };
        if let Err(err) = snapshot.validate() {
            self.record_failure_entry(ActivityKind::Config, "configuration rejected", &err)
                .await;
            self.set_task("waiting for valid configuration");
            return self.wait_chunk(self.settings.engine.poll_interval()).await;
        }

        let action = match self.next_candidate(&snapshot, now).await {
            Ok(Some(action)) => action,
            Ok(None) => return self.wait_for_work(&snapshot, now).await,
            Err(err) => {
                self.record_failure_entry(ActivityKind::Error, "failed to fetch next action", &err)
                    .await;
                return self.wait_chunk(self.settings.engine.poll_interval()).await;
            }
        };

        let rate = &snapshot.rate_limits;
        let stealth = &snapshot.stealth;

        // Pacing.
        let eligible_at = next_eligible_time(now, rate, stealth);
        if eligible_at > now {
            debug!(action_id = %action.id, eligible_at = %eligible_at, "outside business hours");
            self.held = Some(action);
            self.set_task("waiting for business hours");
            return self.wait_chunk(until(now, eligible_at)).await;
        }

        // Daily quota.
        if !self.limiter.try_consume(action.kind, rate) {
            let limit = rate.limit_for(action.kind);
            self.defer(action, limit).await;
            return Flow::Continue;
        }

        // Burst bucket.
        if let Some(wait) = self.limiter.burst_wait(action.kind, now, rate, stealth) {
            debug!(action_id = %action.id, wait_ms = wait.as_millis() as u64, "burst bucket empty");
            self.held = Some(action);
            self.set_task("waiting for burst token");
            return self.wait_chunk(wait).await;
        }

        // Humanization.
        let mut delay = self.sampler.action_delay(rate);
        if let Some(pause) = self.sampler.break_pause(stealth) {
            info!(break_ms = pause.as_millis() as u64, "taking a break");
            delay += pause;
        }
        self.set_task(format!("waiting before {} {}", action.kind, action.target));
        debug!(action_id = %action.id, delay_ms = delay.as_millis() as u64, "humanization delay");
        match self.wait(delay).await {
            Wake::Elapsed => {}
            Wake::Interrupted => {
                self.held = Some(action);
                return Flow::Continue;
            }
            Wake::Shutdown => {
                self.held = Some(action);
                return Flow::Exit;
            }
        }

        let now = self.deps.clock.now();
        if !is_eligible(now, rate, stealth) {
            debug!(action_id = %action.id, "business hours closed during humanization wait");
            self.held = Some(action);
            return Flow::Continue;
        }

        self.dispatch(action, &snapshot).await
    }

    /// Held candidate first, then the earliest due retry, then the store.
    async fn next_candidate(
        &mut self,
        snapshot: &EngineSnapshot,
        now: DateTime<Utc>,
    ) -> CadenceResult<Option<PendingAction>> {
        if let Some(action) = self.held.take() {
            return Ok(Some(action));
        }

        let due = self
            .retries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.not_before <= now)
            .min_by_key(|(_, entry)| entry.not_before)
            .map(|(idx, _)| idx);
        if let Some(entry) = due.and_then(|idx| self.retries.remove(idx)) {
            debug!(action_id = %entry.action.id, attempt = entry.action.attempt, "retrying action");
            return Ok(Some(entry.action));
        }

        let exclude_kinds = self.limiter.exhausted_kinds(&snapshot.rate_limits);
        if exclude_kinds.len() == ActionKind::ALL.len() {
            return Ok(None);
        }
        let query = CandidateQuery {
            active_search_criteria: snapshot.active_search_criteria.clone(),
            exclude_kinds,
        };
        self.store_call("next_candidate_action", self.deps.store.next_candidate_action(&query))
            .await
    }

    /// Nothing to do: wait for the next poll, retry, or day boundary.
    async fn wait_for_work(&mut self, snapshot: &EngineSnapshot, now: DateTime<Utc>) -> Flow {
        let all_spent =
            self.limiter.exhausted_kinds(&snapshot.rate_limits).len() == ActionKind::ALL.len();
        let mut wake_at = if all_spent {
            self.set_task("daily quota exhausted");
            next_day_boundary(now)
        } else {
            self.set_task("idle: no pending actions");
            now + chrono::Duration::from_std(self.settings.engine.poll_interval())
                .unwrap_or_else(|_| chrono::Duration::seconds(30))
        };
        let next_retry = self.retries.iter().map(|entry| entry.not_before);
        let next_write = self.unwritten.iter().map(|write| write.not_before);
        if let Some(earliest) = next_retry.chain(next_write).min() {
            wake_at = wake_at.min(earliest);
        }
        self.wait_chunk(until(now, wake_at)).await
    }

    async fn defer(&mut self, action: PendingAction, limit: u32) {
        let now = self.deps.clock.now();
        warn!(
            action_id = %action.id,
            kind = %action.kind,
            count = self.limiter.count(action.kind),
            limit,
            "daily quota exhausted; deferring action"
        );
        let details = json!({
            "action_id": action.id,
            "kind": action.kind,
            "target": action.target,
            "count": self.limiter.count(action.kind),
            "limit": limit,
        });

        if let Err(err) = self.store_call("defer_action", self.deps.store.defer_action(&action)).await {
            // Keep the action ourselves until tomorrow rather than lose it.
            warn!(action_id = %action.id, error = %err, "store refused deferral; holding action");
            self.retries.push_back(RetryEntry {
                action: action.clone(),
                not_before: next_day_boundary(now),
                quota_denied: true,
            });
        }

        self.record_activity(ActivityEntry::new(
            ActivityKind::Deferred,
            ActivityStatus::Deferred,
            format!("daily {} quota reached; deferred {}", action.kind, action.target),
            details,
            now,
        ))
        .await;
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: PendingAction, snapshot: &EngineSnapshot) -> Flow {
        let stealth = &snapshot.stealth;
        let profile = self.sampler.interaction_profile(&action, stealth);
        let dispatch = Dispatch {
            action: action.clone(),
            stealth: stealth.clone(),
            profile,
        };

        self.set_task(format!("{} {}", action.kind, action.target));
        info!(
            action_id = %action.id,
            kind = %action.kind,
            target = %action.target,
            attempt = action.attempt + 1,
            "dispatching action"
        );

        match self.race_dispatch(dispatch).await {
            DispatchEnd::Finished { result, deferred } => {
                let outcome = self.classify(result);
                self.handle_outcome(action, outcome, snapshot).await;
                for cmd in deferred {
                    let result = self.apply(cmd.kind).await;
                    let _ = cmd.reply.send(result);
                }
                Flow::Continue
            }
            DispatchEnd::Stopped { stop, deferred } => {
                self.record_cancelled(&action).await;
                let result = self.apply(stop.kind).await;
                let _ = stop.reply.send(result);
                for cmd in deferred {
                    let result = self.apply(cmd.kind).await;
                    let _ = cmd.reply.send(result);
                }
                Flow::Continue
            }
            DispatchEnd::Shutdown => {
                self.record_cancelled(&action).await;
                Flow::Exit
            }
        }
    }

    /// Run the actuator call while still serving commands.
    ///
    /// The dispatch future owns its inputs, so returning from here drops (and
    /// thereby cancels) it. Pause requests are collected and answered once
    /// the outcome is recorded.
    async fn race_dispatch(&mut self, dispatch: Dispatch) -> DispatchEnd {
        let actuator = Arc::clone(&self.deps.actuator);
        let limit = self.settings.engine.dispatch_timeout();
        let call = async move { tokio::time::timeout(limit, actuator.perform(&dispatch)).await };
        tokio::pin!(call);

        let mut deferred = Vec::new();
        loop {
            tokio::select! {
                result = &mut call => return DispatchEnd::Finished { result, deferred },
                _ = self.shutdown.cancelled() => return DispatchEnd::Shutdown,
                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else { return DispatchEnd::Shutdown };
                    match cmd.kind {
                        LifecycleCommand::Stop => return DispatchEnd::Stopped { stop: cmd, deferred },
                        LifecycleCommand::Pause => {
                            debug!("pause requested mid-dispatch; deferring until outcome is recorded");
                            deferred.push(cmd);
                        }
                        _ => {
                            let result = self.apply(cmd.kind).await;
                            let _ = cmd.reply.send(result);
                        }
                    }
                }
            }
        }
    }

    fn classify(
        &self,
        result: Result<CadenceResult<ActionOutcome>, tokio::time::error::Elapsed>,
    ) -> ActionOutcome {
        let now = self.deps.clock.now();
        match result {
            Ok(Ok(outcome)) if outcome.success => outcome,
            Ok(Ok(outcome)) => ActionOutcome {
                error_kind: Some(outcome.error_kind.unwrap_or(ActionErrorKind::Unclassified)),
                ..outcome
            },
            Ok(Err(err)) => ActionOutcome::failed(err.kind(), err.to_string(), now),
            Err(_) => {
                let err = CadenceError::Timeout {
                    operation: "dispatch".to_string(),
                    after_ms: duration_ms(self.settings.engine.dispatch_timeout()),
                };
                ActionOutcome::failed(ActionErrorKind::Timeout, err.to_string(), now)
            }
        }
    }

    async fn handle_outcome(&mut self, action: PendingAction, outcome: ActionOutcome, snapshot: &EngineSnapshot) {
        if outcome.success {
            self.on_success(action, outcome, snapshot).await;
        } else {
            self.on_failure(action, outcome).await;
        }
    }

    async fn on_success(&mut self, action: PendingAction, outcome: ActionOutcome, snapshot: &EngineSnapshot) {
        let now = self.deps.clock.now();
        if self.limiter.commit(action.kind, now) {
            debug!(action_id = %action.id, "success landed after the day boundary");
        }
        self.sync_counters();
        self.state.last_action_at = Some(now);
        self.consecutive_failed_actions = 0;

        info!(
            action_id = %action.id,
            kind = %action.kind,
            target = %action.target,
            connections_today = self.state.connections_today,
            messages_today = self.state.messages_today,
            "action succeeded"
        );
        self.record_activity(ActivityEntry::new(
            activity_kind(action.kind),
            ActivityStatus::Success,
            describe(&action, "sent"),
            json!({ "action_id": action.id, "target": action.target, "attempt": action.attempt + 1 }),
            now,
        ))
        .await;
        self.write_outcome(&action, &outcome).await;

        if let Some(cooldown) = self.sampler.record_success(&snapshot.stealth) {
            self.cooldown_until = Some(now + to_chrono(cooldown));
        }
        self.persist().await;
        self.publish();
    }

    async fn on_failure(&mut self, mut action: PendingAction, outcome: ActionOutcome) {
        let now = self.deps.clock.now();
        let kind = outcome.error_kind.unwrap_or(ActionErrorKind::Unclassified);
        let message = outcome.error_message.clone().unwrap_or_else(|| format!("{kind:?}"));
        self.sampler.record_failure();
        action.attempt += 1;

        let mut details = json!({
            "action_id": action.id,
            "target": action.target,
            "attempt": action.attempt,
            "error_kind": kind,
            "error": message,
        });

        if kind.is_fatal() {
            warn!(action_id = %action.id, error = %message, "fatal dispatch failure");
            self.record_activity(ActivityEntry::new(
                ActivityKind::Error,
                ActivityStatus::Failure,
                describe(&action, "rejected"),
                details,
                now,
            ))
            .await;
            self.write_outcome(&action, &outcome).await;
            self.fault(message).await;
            return;
        }

        if kind == ActionErrorKind::RateLimitedByPlatform {
            let cooldown = self.sampler.platform_cooldown();
            let end = now + to_chrono(cooldown);
            self.cooldown_until = Some(self.cooldown_until.map_or(end, |current| current.max(end)));
            warn!(cooldown_ms = duration_ms(cooldown), "platform rate limit; cooling down");
        }

        if kind.is_transient() && self.settings.retry.should_retry(action.attempt) {
            let backoff = self.sampler.backoff_jitter(
                self.settings.retry.backoff(action.attempt),
                self.settings.retry.jitter_fraction,
            );
            let not_before = now + to_chrono(backoff);
            details["retry_at"] = json!(not_before);
            warn!(
                action_id = %action.id,
                attempt = action.attempt,
                backoff_ms = duration_ms(backoff),
                error = %message,
                "dispatch failed; retry scheduled"
            );
            self.record_activity(ActivityEntry::new(
                ActivityKind::Retry,
                ActivityStatus::Warning,
                describe(&action, "will be retried"),
                details,
                now,
            ))
            .await;
            self.write_outcome(&action, &outcome).await;
            self.retries.push_back(RetryEntry {
                action,
                not_before,
                quota_denied: false,
            });
            return;
        }

        self.consecutive_failed_actions += 1;
        warn!(
            action_id = %action.id,
            attempts = action.attempt,
            consecutive_failed_actions = self.consecutive_failed_actions,
            error = %message,
            "action failed"
        );
        self.record_activity(ActivityEntry::new(
            activity_kind(action.kind),
            ActivityStatus::Failure,
            describe(&action, "failed"),
            details,
            now,
        ))
        .await;
        self.write_outcome(&action, &outcome).await;

        if self.consecutive_failed_actions >= self.settings.engine.fatal_failure_threshold {
            let reason = format!(
                "{} consecutive actions failed; last error: {}",
                self.consecutive_failed_actions, message
            );
            self.fault(reason).await;
        }
    }

    async fn record_cancelled(&mut self, action: &PendingAction) {
        let now = self.deps.clock.now();
        let outcome = ActionOutcome::failed(ActionErrorKind::Cancelled, "dispatch cancelled by stop", now);
        warn!(action_id = %action.id, "in-flight dispatch cancelled");
        self.record_activity(ActivityEntry::new(
            activity_kind(action.kind),
            ActivityStatus::Warning,
            describe(action, "cancelled"),
            json!({ "action_id": action.id, "target": action.target, "error_kind": ActionErrorKind::Cancelled }),
            now,
        ))
        .await;
        self.write_outcome(action, &outcome).await;
    }

    // ── Waiting ───────────────────────────────────────────────────────────────

    /// Sleep for `duration` while serving commands.
    async fn wait(&mut self, duration: Duration) -> Wake {
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return Wake::Elapsed,
                _ = self.shutdown.cancelled() => return Wake::Shutdown,
                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else { return Wake::Shutdown };
                    let result = self.apply(cmd.kind).await;
                    let _ = cmd.reply.send(result);
                    if self.state.status != AutomationStatus::Running {
                        return Wake::Interrupted;
                    }
                }
            }
        }
    }

    /// Wait at most one chunk, then let the loop re-evaluate.
    async fn wait_chunk(&mut self, duration: Duration) -> Flow {
        let chunk = duration.min(self.settings.engine.max_wait_chunk());
        match self.wait(chunk).await {
            Wake::Shutdown => Flow::Exit,
            Wake::Elapsed | Wake::Interrupted => Flow::Continue,
        }
    }

    // ── Side effects ──────────────────────────────────────────────────────────

    async fn store_call<T>(
        &self,
        operation: &str,
        call: impl std::future::Future<Output = CadenceResult<T>>,
    ) -> CadenceResult<T> {
        let limit = self.settings.engine.store_timeout();
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(CadenceError::Timeout {
                operation: operation.to_string(),
                after_ms: duration_ms(limit),
            }),
        }
    }

    /// Write one entry to the recorder and the store's activity log.
    async fn record_activity(&self, entry: ActivityEntry) {
        if let Err(err) = self.deps.recorder.record(&entry) {
            warn!(entry_id = %entry.id, error = %err, "activity recorder rejected entry");
        }
        if let Err(err) = self
            .store_call("append_activity_log", self.deps.store.append_activity_log(&entry))
            .await
        {
            warn!(entry_id = %entry.id, error = %err, "failed to append activity to store");
        }
    }

    async fn record_failure_entry(&self, kind: ActivityKind, what: &str, err: &CadenceError) {
        warn!(error = %err, "{}", what);
        self.record_activity(ActivityEntry::new(
            kind,
            ActivityStatus::Failure,
            format!("{what}: {err}"),
            json!({ "error_kind": err.kind(), "error": err.to_string() }),
            self.deps.clock.now(),
        ))
        .await;
    }

    /// Write one outcome; on failure keep it for `flush_outcomes`.
    async fn write_outcome(&mut self, action: &PendingAction, outcome: &ActionOutcome) {
        let written = self
            .store_call("record_outcome", self.deps.store.record_outcome(action, outcome))
            .await;
        if let Err(err) = written {
            self.record_failure_entry(ActivityKind::Error, "failed to record outcome", &err)
                .await;
            self.queue_write(action.clone(), outcome.clone(), 1);
        }
    }

    fn queue_write(&mut self, action: PendingAction, outcome: ActionOutcome, attempts: u32) {
        let backoff = self.sampler.backoff_jitter(
            self.settings.retry.backoff(attempts),
            self.settings.retry.jitter_fraction,
        );
        let not_before = self.deps.clock.now() + to_chrono(backoff);
        debug!(action_id = %action.id, attempts, backoff_ms = duration_ms(backoff), "outcome write queued");
        self.unwritten.push_back(UnwrittenOutcome {
            action,
            outcome,
            attempts,
            not_before,
        });
    }

    /// Retry every queued outcome write that is due. Writes keep their place
    /// until the store accepts them; the backoff stops growing at
    /// `max_delay_ms`.
    async fn flush_outcomes(&mut self, now: DateTime<Utc>) {
        for write in std::mem::take(&mut self.unwritten) {
            if write.not_before > now {
                self.unwritten.push_back(write);
                continue;
            }
            let written = self
                .store_call("record_outcome", self.deps.store.record_outcome(&write.action, &write.outcome))
                .await;
            match written {
                Ok(()) => info!(action_id = %write.action.id, attempts = write.attempts + 1, "queued outcome written"),
                Err(err) => {
                    warn!(action_id = %write.action.id, attempts = write.attempts + 1, error = %err, "outcome write failed again");
                    self.queue_write(write.action, write.outcome, write.attempts + 1);
                }
            }
        }
    }

    async fn persist(&self) {
        if let Err(err) = self
            .store_call("persist_state", self.deps.store.persist_state(&self.state))
            .await
        {
            warn!(error = %err, "failed to persist automation state");
            if let Err(err) = self.deps.recorder.record(&ActivityEntry::new(
                ActivityKind::Error,
                ActivityStatus::Failure,
                format!("failed to persist state: {err}"),
                json!({ "error_kind": err.kind() }),
                self.deps.clock.now(),
            )) {
                warn!(error = %err, "activity recorder rejected entry");
            }
        }
    }

    fn set_task(&mut self, task: impl Into<String>) {
        let task = Some(task.into());
        if self.state.current_task != task {
            self.state.current_task = task;
            self.publish();
        }
    }

    fn sync_counters(&mut self) {
        self.state.connections_today = self.limiter.count(ActionKind::Connect);
        self.state.messages_today = self.limiter.count(ActionKind::FollowUp);
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }
}

fn activity_kind(kind: ActionKind) -> ActivityKind {
    match kind {
        ActionKind::Connect => ActivityKind::Connect,
        ActionKind::FollowUp => ActivityKind::Message,
    }
}

fn describe(action: &PendingAction, verb: &str) -> String {
    match action.kind {
        ActionKind::Connect => format!("connection request to {} {verb}", action.target),
        ActionKind::FollowUp => format!("follow-up message to {} {verb}", action.target),
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(1))
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
