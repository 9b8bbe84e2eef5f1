//! A free-running simulation for the demo's `simulate` command.
//!
//! Starts the engine on the wall clock with the given documents, prints
//! every change of status or task, and accepts one pending connection
//! request per second so follow-ups come due during the run.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use cadence_activity::ActivitySummary;
use cadence_contracts::state::AutomationState;
use cadence_core::SystemClock;
use cadence_policy::settings::EngineSettings;

use crate::{
    error::ScenarioResult,
    harness::Simulation,
    store::{ConnectionStatus, StoreConfig},
};

const DISPATCH_LATENCY: Duration = Duration::from_millis(200);

/// What a simulated run achieved.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub state: AutomationState,
    pub summary: ActivitySummary,
    pub dispatches: usize,
    pub deferred: usize,
    pub chain_verified: bool,
}

pub async fn run_simulation(
    config: StoreConfig,
    settings: EngineSettings,
    run_for: Duration,
) -> ScenarioResult<SimulationReport> {
    let sim = Simulation::build(config, settings, Arc::new(SystemClock), DISPATCH_LATENCY);
    let mut updates = sim.engine.subscribe();
    sim.engine.start().await?;

    let deadline = tokio::time::sleep(run_for);
    tokio::pin!(deadline);
    let mut accept_tick = tokio::time::interval(Duration::from_secs(1));
    let mut last_line = String::new();

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                let line = format!(
                    "  [{}] {} | connections {} | messages {}",
                    state.status,
                    state.current_task.as_deref().unwrap_or("-"),
                    state.connections_today,
                    state.messages_today
                );
                if line != last_line {
                    println!("{line}");
                    last_line = line;
                }
            }
            _ = accept_tick.tick() => {
                let pending = sim
                    .store
                    .connections()
                    .into_iter()
                    .find(|c| c.status == ConnectionStatus::Pending);
                if let Some(connection) = pending {
                    if sim.store.accept_connection(&connection.prospect.profile_url) {
                        debug!(connection_id = %connection.id, "simulated acceptance");
                        println!("  + {} accepted the connection request", connection.prospect.full_name());
                    }
                }
            }
        }
    }

    let state = sim.engine.stop().await?;
    let report = SimulationReport {
        state,
        summary: sim.recorder.summary(),
        dispatches: sim.actuator.dispatch_count(),
        deferred: sim.store.deferred_actions().len(),
        chain_verified: sim.recorder.verify_integrity(),
    };
    sim.engine.shutdown().await;
    Ok(report)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::scenario_config;

    #[tokio::test]
    async fn short_run_dispatches_and_keeps_chain_intact() {
        let (config, settings) = scenario_config().unwrap();
        let report = run_simulation(config, settings, Duration::from_millis(2_500))
            .await
            .unwrap();

        assert!(report.dispatches >= 3, "only {} dispatches", report.dispatches);
        assert!(report.chain_verified);
        assert_eq!(report.summary.connections_sent, u64::from(report.state.connections_today));
        assert!(report.summary.messages_sent >= 1);
    }
}
