//! Wiring shared by the scenarios and the simulated run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cadence_activity::InMemoryActivityRecorder;
use cadence_contracts::activity::ActivityEntry;
use cadence_core::{Clock, Engine, EngineDeps};
use cadence_policy::settings::EngineSettings;

use crate::{
    actuator::ScriptedActuator,
    error::{ensure, ScenarioError, ScenarioResult},
    store::{InMemoryStore, StoreConfig},
    SCENARIO_CONFIG,
};

/// The fast store documents and engine settings every scenario starts from.
pub fn scenario_config() -> ScenarioResult<(StoreConfig, EngineSettings)> {
    Ok((
        StoreConfig::from_toml_str(SCENARIO_CONFIG)?,
        EngineSettings::from_toml_str(SCENARIO_CONFIG)?,
    ))
}

/// An engine running against the in-memory collaborators.
pub struct Simulation {
    pub engine: Engine,
    pub store: InMemoryStore,
    pub actuator: ScriptedActuator,
    pub recorder: InMemoryActivityRecorder,
}

impl Simulation {
    /// Seed a store with the mock data and spawn an engine over it.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(config: StoreConfig, settings: EngineSettings, clock: Arc<dyn Clock>, latency: Duration) -> Self {
        let store = InMemoryStore::with_mock_data(config, Arc::clone(&clock));
        let actuator = ScriptedActuator::new(store.clone(), Arc::clone(&clock), settings.humanize.seed.unwrap_or(0))
            .with_latency(latency);
        let recorder = InMemoryActivityRecorder::new();
        let deps = EngineDeps {
            store: Arc::new(store.clone()),
            actuator: Arc::new(actuator.clone()),
            recorder: Arc::new(recorder.clone()),
            clock,
        };
        Self {
            engine: Engine::spawn(deps, settings),
            store,
            actuator,
            recorder,
        }
    }

    /// Poll `condition` every 10ms until it holds or `limit` passes.
    pub async fn wait_for(
        &self,
        what: &str,
        limit: Duration,
        mut condition: impl FnMut(&Simulation) -> bool,
    ) -> ScenarioResult<()> {
        let started = Instant::now();
        while !condition(self) {
            if started.elapsed() >= limit {
                return Err(ScenarioError::WaitTimedOut {
                    what: what.to_string(),
                    after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                });
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }

    /// Check the recorder's hash chain and print the result.
    pub fn verify_activity_chain(&self) -> ScenarioResult<()> {
        let verified = self.recorder.verify_integrity();
        println!(
            "  Activity chain: {} ({} entries)",
            if verified { "VERIFIED" } else { "FAILED" },
            self.recorder.len()
        );
        ensure(verified, "activity hash chain failed verification")
    }

    /// Print the newest `limit` activity entries, oldest first.
    pub fn print_activity(&self, limit: usize) {
        let mut entries: Vec<ActivityEntry> = self.recorder.recent(limit);
        entries.reverse();
        for entry in entries {
            println!(
                "    {:<9} {:<8} {}",
                format!("{:?}", entry.action_type).to_lowercase(),
                format!("{:?}", entry.status).to_lowercase(),
                entry.description
            );
        }
    }

    /// Stop the loop, print the closing state, and shut the actor down.
    pub async fn finish(self) -> ScenarioResult<()> {
        let state = self.engine.stop().await?;
        println!(
            "  Final state:    {} | connections today: {} | messages today: {}",
            state.status, state.connections_today, state.messages_today
        );
        self.verify_activity_chain()?;
        self.engine.shutdown().await;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
