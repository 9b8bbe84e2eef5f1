//! Scenario 3: Business hours
//!
//! The clock starts on a Saturday. With `respect_business_hours` and
//! `skip_weekends` on, the engine holds its first candidate and dispatches
//! nothing. Moving the clock to Monday morning releases it; moving it past
//! the end of the window stops dispatching again.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use cadence_policy::pacing::within_business_hours;

use crate::{
    clock::ManualClock,
    error::{ensure, ScenarioResult},
    harness::{scenario_config, Simulation},
};

const WAITING: &str = "waiting for business hours";

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

/// Run Scenario 3: Business hours.
pub async fn run_scenario() -> ScenarioResult<()> {
    println!("=== Scenario 3: Business hours ===");
    println!();

    let (mut config, settings) = scenario_config()?;
    config.stealth.respect_business_hours = true;
    config.rate_limits.business_hours_start = 9;
    config.rate_limits.business_hours_end = 18;
    config.rate_limits.skip_weekends = true;
    // Slow enough that the evening switch lands before the queue runs dry.
    config.rate_limits.min_action_delay_ms = 40;
    config.rate_limits.max_action_delay_ms = 80;
    let rate_limits = config.rate_limits.clone();

    let clock = ManualClock::new(at(17, 11, 0));
    let sim = Simulation::build(config, settings, Arc::new(clock.clone()), Duration::from_millis(10));
    println!("  Window: {:02}:00–{:02}:00 UTC, weekdays only", rate_limits.business_hours_start, rate_limits.business_hours_end);
    println!();

    // ── Saturday ──────────────────────────────────────────────────────────────

    sim.engine.start().await?;
    sim.wait_for("the engine to hold for business hours", Duration::from_secs(5), |sim| {
        sim.engine.get_state().current_task.as_deref() == Some(WAITING)
    })
    .await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    println!("  Saturday 11:00  → task: {WAITING}, dispatches: {}", sim.actuator.dispatch_count());
    ensure(sim.actuator.dispatch_count() == 0, "nothing may be dispatched on a Saturday")?;

    // ── Monday morning ────────────────────────────────────────────────────────

    clock.set(at(19, 9, 30));
    sim.wait_for("Monday dispatches", Duration::from_secs(5), |sim| sim.actuator.dispatch_count() >= 3)
        .await?;
    let monday = sim.actuator.dispatches();
    println!("  Monday 09:30    → dispatches: {}", monday.len());
    ensure(
        monday.iter().all(|d| within_business_hours(d.at, &rate_limits)),
        "a dispatch happened outside business hours",
    )?;

    // ── Monday evening ────────────────────────────────────────────────────────

    clock.set(at(19, 18, 5));
    sim.wait_for("the engine to hold again", Duration::from_secs(5), |sim| {
        sim.engine.get_state().current_task.as_deref() == Some(WAITING)
    })
    .await?;
    let closed_at = sim.actuator.dispatch_count();
    tokio::time::sleep(Duration::from_millis(200)).await;
    println!("  Monday 18:05    → task: {WAITING}, dispatches: {}", sim.actuator.dispatch_count());
    ensure(
        sim.actuator.dispatch_count() == closed_at,
        "dispatching continued after business hours closed",
    )?;
    println!();

    sim.finish().await?;
    println!("  Scenario 3 complete.");
    println!();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use cadence_contracts::config::RateLimitConfig;

    use super::*;

    #[test]
    fn scenario_instants_fall_where_expected() {
        let rate = RateLimitConfig::default();
        assert!(!within_business_hours(at(17, 11, 0), &rate));
        assert!(within_business_hours(at(19, 9, 30), &rate));
        assert!(!within_business_hours(at(19, 18, 5), &rate));
    }

    #[tokio::test]
    async fn no_dispatch_outside_business_hours() {
        run_scenario().await.unwrap();
    }
}
