//! A scripted stand-in for the browser driver.
//!
//! `ScriptedActuator` does what a real driver would up to the point of
//! touching the page: it resolves the prospect, renders the template, samples
//! a keystroke sequence for the text, and optionally sleeps to simulate page
//! latency. The result of each dispatch comes from a script (per target, or
//! for the next dispatches regardless of target) and defaults to success.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info};

use cadence_contracts::{
    action::{ActionOutcome, Dispatch, PendingAction},
    error::{CadenceError, CadenceResult},
    records::TemplateType,
};
use cadence_core::{Actuator, Clock};
use cadence_humanize::typing::typing_profile;
use cadence_templates::{render_template, TemplateLibrary};

use crate::store::InMemoryStore;

/// One dispatch as the actuator saw it.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub action: PendingAction,
    pub at: DateTime<Utc>,
    /// Rendered note or message, when a template applied.
    pub text: Option<String>,
    /// Keystrokes typed for `text`, typos and corrections included.
    pub keystrokes: usize,
    pub think_time_ms: u64,
}

#[derive(Default)]
struct Script {
    by_target: HashMap<String, VecDeque<CadenceResult<ActionOutcome>>>,
    next: VecDeque<CadenceResult<ActionOutcome>>,
}

#[derive(Clone)]
pub struct ScriptedActuator {
    store: InMemoryStore,
    clock: Arc<dyn Clock>,
    latency: Duration,
    script: Arc<Mutex<Script>>,
    dispatches: Arc<Mutex<Vec<DispatchRecord>>>,
    rng: Arc<Mutex<StdRng>>,
}

impl ScriptedActuator {
    pub fn new(store: InMemoryStore, clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self {
            store,
            clock,
            latency: Duration::ZERO,
            script: Arc::new(Mutex::new(Script::default())),
            dispatches: Arc::new(Mutex::new(Vec::new())),
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Sleep this long inside every dispatch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Results for the next dispatches to `target`, in order.
    pub fn script_target(&self, target: &str, results: Vec<CadenceResult<ActionOutcome>>) {
        self.lock_script()
            .by_target
            .insert(target.to_string(), results.into_iter().collect());
    }

    /// Results for the next dispatches, whatever their target. Per-target
    /// scripts take precedence.
    pub fn script_next(&self, results: Vec<CadenceResult<ActionOutcome>>) {
        self.lock_script().next.extend(results);
    }

    pub fn dispatches(&self) -> Vec<DispatchRecord> {
        self.lock_dispatches().clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.lock_dispatches().len()
    }

    fn lock_script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().expect("actuator script lock poisoned")
    }

    fn lock_dispatches(&self) -> MutexGuard<'_, Vec<DispatchRecord>> {
        self.dispatches.lock().expect("actuator dispatch lock poisoned")
    }

    fn render(&self, action: &PendingAction) -> CadenceResult<Option<String>> {
        let Some(prospect) = self.store.prospect_for(action) else {
            return Err(CadenceError::TargetUnavailable {
                reason: format!("no profile found for {}", action.target),
            });
        };
        let library = TemplateLibrary::new(self.store.templates())?;
        let template_type = TemplateType::for_action(action.kind);
        match library.select(action.template_id.as_deref(), template_type) {
            Some(template) => render_template(template, &prospect.template_vars()).map(Some),
            None => {
                debug!(action_id = %action.id, "no active template; sending without text");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Actuator for ScriptedActuator {
    async fn perform(&self, dispatch: &Dispatch) -> CadenceResult<ActionOutcome> {
        let action = &dispatch.action;
        let at = self.clock.now();
        let mut record = DispatchRecord {
            action: action.clone(),
            at,
            text: None,
            keystrokes: 0,
            think_time_ms: dispatch.profile.think_time_ms,
        };

        let rendered = self.render(action);
        if let Ok(Some(text)) = &rendered {
            let keys = {
                let mut rng = self.rng.lock().expect("actuator rng lock poisoned");
                typing_profile(&mut *rng, text, &dispatch.stealth)
            };
            record.keystrokes = keys.len();
            record.text = Some(text.clone());
        }
        self.lock_dispatches().push(record);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted = {
            let mut script = self.lock_script();
            let by_target = script
                .by_target
                .get_mut(&action.target)
                .and_then(|results| results.pop_front());
            by_target.or_else(|| script.next.pop_front())
        };
        if let Some(result) = scripted {
            return result;
        }

        rendered?;
        info!(action_id = %action.id, kind = %action.kind, target = %action.target, "simulated action performed");
        Ok(ActionOutcome::succeeded(self.clock.now()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use cadence_contracts::{
        action::{ActionErrorKind, ActionKind},
        config::StealthConfig,
        profile::InteractionProfile,
        records::CandidateQuery,
    };
    use cadence_core::Store;

    use super::*;
    use crate::{clock::ManualClock, store::StoreConfig};

    fn setup() -> (InMemoryStore, ScriptedActuator) {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap()));
        let store = InMemoryStore::with_mock_data(StoreConfig::default(), Arc::clone(&clock));
        let actuator = ScriptedActuator::new(store.clone(), clock, 3);
        (store, actuator)
    }

    async fn first_connect(store: &InMemoryStore) -> PendingAction {
        let query = CandidateQuery {
            active_search_criteria: store.load_config().await.unwrap().active_search_criteria,
            exclude_kinds: Default::default(),
        };
        store.next_candidate_action(&query).await.unwrap().unwrap()
    }

    fn dispatch(action: PendingAction) -> Dispatch {
        Dispatch {
            action,
            stealth: StealthConfig::default(),
            profile: InteractionProfile::default(),
        }
    }

    #[tokio::test]
    async fn renders_personalised_note() {
        let (store, actuator) = setup();
        let action = first_connect(&store).await;
        assert_eq!(action.kind, ActionKind::Connect);

        let outcome = actuator.perform(&dispatch(action)).await.unwrap();
        assert!(outcome.success);

        let records = actuator.dispatches();
        let text = records[0].text.as_deref().unwrap();
        assert!(text.starts_with("Hi Ines,"), "unexpected note: {text}");
        assert!(text.contains("Harborlight Analytics"));
        assert!(records[0].keystrokes >= text.chars().count());
    }

    #[tokio::test]
    async fn scripts_take_precedence_over_success() {
        let (store, actuator) = setup();
        let action = first_connect(&store).await;
        actuator.script_next(vec![Err(CadenceError::RateLimitedByPlatform {
            reason: "429".to_string(),
        })]);
        actuator.script_target(
            &action.target,
            vec![Ok(ActionOutcome::failed(
                ActionErrorKind::TargetUnavailable,
                "profile hidden",
                Utc::now(),
            ))],
        );

        let first = actuator.perform(&dispatch(action.clone())).await.unwrap();
        assert_eq!(first.error_kind, Some(ActionErrorKind::TargetUnavailable));
        let second = actuator.perform(&dispatch(action.clone())).await;
        assert!(matches!(second, Err(CadenceError::RateLimitedByPlatform { .. })));
        assert!(actuator.perform(&dispatch(action)).await.unwrap().success);
        assert_eq!(actuator.dispatch_count(), 3);
    }

    #[tokio::test]
    async fn unknown_target_is_unavailable() {
        let (_, actuator) = setup();
        let action = PendingAction::new(ActionKind::Connect, "https://www.linkedin.com/in/nobody", None);
        let err = actuator.perform(&dispatch(action)).await.unwrap_err();
        assert!(matches!(err, CadenceError::TargetUnavailable { .. }));
    }
}
