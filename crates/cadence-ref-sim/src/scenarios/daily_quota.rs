//! Scenario 1: Daily quota
//!
//! The connection limit is set to two. The first prospect fails once with
//! a transient error, so by the time its retry comes due the two other
//! connection requests have used up the quota. The retry is deferred to the
//! store until the next UTC day and the loop moves on to follow-up messages,
//! which have quota left.

use std::sync::Arc;
use std::time::Duration;

use cadence_contracts::{action::ActionKind, error::CadenceError, state::AutomationStatus};
use cadence_core::SystemClock;

use crate::{
    error::{ensure, ScenarioResult},
    harness::{scenario_config, Simulation},
    mock_data,
};

pub const CONNECTION_LIMIT: u32 = 2;

/// Run Scenario 1: Daily quota.
pub async fn run_scenario() -> ScenarioResult<()> {
    println!("=== Scenario 1: Daily quota ===");
    println!();

    let (mut config, mut settings) = scenario_config()?;
    config.rate_limits.daily_connection_limit = CONNECTION_LIMIT;
    // Keep the retry well behind the next two dispatches.
    settings.retry.base_delay_ms = 400;
    settings.retry.max_delay_ms = 800;

    let sim = Simulation::build(config, settings, Arc::new(SystemClock), Duration::from_millis(10));
    let first = mock_data::prospects()[0].clone();
    sim.actuator.script_target(
        &first.profile_url,
        vec![Err(CadenceError::TargetUnavailable {
            reason: "profile page did not load".to_string(),
        })],
    );

    println!("  Daily connection limit: {}", CONNECTION_LIMIT);
    println!("  {} fails once; connection requests continue to others", first.full_name());
    println!();

    sim.engine.start().await?;
    sim.wait_for("deferral and follow-ups", Duration::from_secs(5), |sim| {
        sim.recorder.summary().deferrals == 1 && sim.engine.get_state().messages_today == 2
    })
    .await?;

    let state = sim.engine.get_state();
    let deferred = sim.store.deferred_actions();
    let connect_dispatches = sim
        .actuator
        .dispatches()
        .iter()
        .filter(|d| d.action.kind == ActionKind::Connect)
        .count();
    let summary = sim.recorder.summary();

    println!("  Connections today: {} / {}", state.connections_today, CONNECTION_LIMIT);
    println!("  Messages today:    {}", state.messages_today);
    println!("  Connect dispatches (incl. failed attempt): {}", connect_dispatches);
    println!("  Deferred until tomorrow: {}", deferred[0].target);
    println!();
    sim.print_activity(8);
    println!();

    ensure(state.status == AutomationStatus::Running, "engine should still be running")?;
    ensure(
        state.connections_today == CONNECTION_LIMIT,
        format!("expected {} connections, got {}", CONNECTION_LIMIT, state.connections_today),
    )?;
    ensure(state.messages_today == 2, "both follow-ups should have been sent")?;
    ensure(connect_dispatches == 3, "the deferred retry must not be dispatched")?;
    ensure(deferred[0].target == first.profile_url, "the retried prospect should be deferred")?;
    ensure(summary.deferrals == 1 && summary.retries == 1, "expected one retry and one deferral")?;

    sim.finish().await?;
    println!("  Scenario 1 complete.");
    println!();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
