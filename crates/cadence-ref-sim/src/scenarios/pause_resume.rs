//! Scenario 4: Pause and resume
//!
//! Each dispatch takes 300ms. A pause issued mid-dispatch is answered only
//! after the dispatch's outcome has been recorded; nothing is dispatched
//! while paused. After resuming, a stop issued mid-dispatch cancels the
//! dispatch and returns at once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cadence_contracts::{action::ActionErrorKind, state::AutomationStatus};
use cadence_core::SystemClock;

use crate::{
    error::{ensure, ScenarioResult},
    harness::{scenario_config, Simulation},
};

const LATENCY: Duration = Duration::from_millis(300);

/// Run Scenario 4: Pause and resume.
pub async fn run_scenario() -> ScenarioResult<()> {
    println!("=== Scenario 4: Pause and resume ===");
    println!();

    let (config, settings) = scenario_config()?;
    let sim = Simulation::build(config, settings, Arc::new(SystemClock), LATENCY);

    // ── Pause mid-dispatch ────────────────────────────────────────────────────

    sim.engine.start().await?;
    sim.wait_for("the first dispatch", Duration::from_secs(5), |sim| sim.actuator.dispatch_count() == 1)
        .await?;
    let paused = sim.engine.pause().await?;
    let recorded = sim.store.outcomes().len();
    println!("  Pause during dispatch → {} (outcomes recorded: {})", paused.status, recorded);
    ensure(paused.status == AutomationStatus::Paused, "engine should be paused")?;
    ensure(recorded == 1, "the in-flight outcome must be recorded before the pause reply")?;
    ensure(paused.connections_today == 1, "the paused snapshot should count the finished dispatch")?;

    tokio::time::sleep(LATENCY + Duration::from_millis(200)).await;
    println!("  While paused          → dispatches: {}", sim.actuator.dispatch_count());
    ensure(sim.actuator.dispatch_count() == 1, "nothing may be dispatched while paused")?;

    // ── Resume, then stop mid-dispatch ────────────────────────────────────────

    let resumed = sim.engine.resume().await?;
    println!("  Resume                → {}", resumed.status);
    sim.wait_for("a dispatch after resume", Duration::from_secs(5), |sim| {
        sim.actuator.dispatch_count() == 2
    })
    .await?;

    let issued = Instant::now();
    let stopped = sim.engine.stop().await?;
    let latency = issued.elapsed();
    let last_outcome = sim.store.outcomes().last().and_then(|(_, o)| o.error_kind);
    println!(
        "  Stop during dispatch  → {} after {}ms (last outcome: {:?})",
        stopped.status,
        latency.as_millis(),
        last_outcome
    );
    ensure(stopped.status == AutomationStatus::Idle, "engine should be idle after stop")?;
    ensure(latency < Duration::from_secs(1), "stop must return within one second")?;
    ensure(
        last_outcome == Some(ActionErrorKind::Cancelled),
        "the interrupted dispatch should be recorded as cancelled",
    )?;
    println!();
    sim.print_activity(6);
    println!();

    sim.finish().await?;
    println!("  Scenario 4 complete.");
    println!();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
