//! Scenario 2: Authentication rejected
//!
//! Start is refused while no credentials are stored. Once they are, the
//! first dispatch is rejected by the platform: the engine moves to Error
//! with the rejection as its message and dispatches nothing more until it
//! is started again.

use std::sync::Arc;
use std::time::Duration;

use cadence_contracts::{error::CadenceError, state::AutomationStatus};
use cadence_core::SystemClock;

use crate::{
    error::{ensure, ScenarioResult},
    harness::{scenario_config, Simulation},
};

const REJECTION: &str = "session cookie expired";

/// Run Scenario 2: Authentication rejected.
pub async fn run_scenario() -> ScenarioResult<()> {
    println!("=== Scenario 2: Authentication rejected ===");
    println!();

    let (mut config, settings) = scenario_config()?;
    config.credentials_configured = false;
    let sim = Simulation::build(config, settings, Arc::new(SystemClock), Duration::from_millis(10));

    // ── Sub-case A: no credentials ────────────────────────────────────────────

    let refused = sim.engine.start().await;
    println!("  Start without credentials: {}", describe(&refused));
    ensure(
        matches!(refused, Err(CadenceError::ConfigurationMissing)),
        "start without credentials should fail with ConfigurationMissing",
    )?;
    ensure(sim.engine.get_state().status == AutomationStatus::Idle, "engine should stay idle")?;

    // ── Sub-case B: platform rejects the session ──────────────────────────────

    sim.store.set_credentials_configured(true);
    sim.actuator.script_next(vec![Err(CadenceError::AuthenticationRejected {
        reason: REJECTION.to_string(),
    })]);

    let started = sim.engine.start().await;
    println!("  Start with credentials:    {}", describe(&started));
    started?;

    sim.wait_for("the engine to enter Error", Duration::from_secs(5), |sim| {
        sim.engine.get_state().status == AutomationStatus::Error
    })
    .await?;
    let state = sim.engine.get_state();
    println!("  Status after dispatch:     {}", state.status);
    println!("  Error message:             {}", state.error_message.as_deref().unwrap_or("-"));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let halted_dispatches = sim.actuator.dispatch_count();
    println!("  Dispatches while in Error: {}", halted_dispatches);
    ensure(halted_dispatches == 1, "no dispatch may follow an authentication rejection")?;
    ensure(
        state.error_message.as_deref().is_some_and(|m| m.contains(REJECTION)),
        "error message should carry the rejection",
    )?;

    // ── Sub-case C: operator starts again ─────────────────────────────────────

    let restarted = sim.engine.start().await?;
    println!("  Restart:                   {}", restarted.status);
    ensure(restarted.error_message.is_none(), "start should clear the error message")?;
    sim.wait_for("dispatches to resume", Duration::from_secs(5), |sim| {
        sim.actuator.dispatch_count() > halted_dispatches
    })
    .await?;
    println!();
    sim.print_activity(5);
    println!();

    sim.finish().await?;
    println!("  Scenario 2 complete.");
    println!();
    Ok(())
}

fn describe<T>(result: &Result<T, CadenceError>) -> String {
    match result {
        Ok(_) => "accepted".to_string(),
        Err(err) => format!("refused ({err})"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
