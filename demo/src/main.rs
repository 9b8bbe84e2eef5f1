//! Cadence Reference Runtime: Demo CLI
//!
//! Runs one or all of the pacing scenarios, or a free-running simulation.
//! Every run uses the real engine, limiter, sampler and activity chain wired
//! to an in-memory store and a scripted actuator with fictional prospects.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- daily-quota
//!   cargo run -p demo -- auth-rejected
//!   cargo run -p demo -- business-hours
//!   cargo run -p demo -- pause-resume
//!   cargo run -p demo -- simulate --config crates/cadence-ref-sim/config/cadence.toml --seconds 30

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cadence_policy::settings::EngineSettings;
use cadence_ref_sim::{
    run_simulation,
    scenarios::{auth_rejected, business_hours, daily_quota, pause_resume},
    ScenarioResult, StoreConfig, DEFAULT_CONFIG,
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Cadence: outreach action scheduling and pacing demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Cadence reference runtime demo",
    long_about = "Runs Cadence scenarios showing daily quotas, fatal failures,\n\
                  business-hours pacing, and pause/stop during a dispatch."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four scenarios in sequence.
    RunAll,
    /// Scenario 1: Daily quota (deferral, then follow-ups proceed).
    DailyQuota,
    /// Scenario 2: Authentication rejected (engine enters Error).
    AuthRejected,
    /// Scenario 3: Business hours (no dispatch outside the window).
    BusinessHours,
    /// Scenario 4: Pause and resume (pause waits for the in-flight outcome).
    PauseResume,
    /// Drive the engine on the wall clock for a while.
    Simulate {
        /// TOML file with [engine], [retry], [humanize], [burst],
        /// [rate_limits] and [stealth] tables. Uses bundled defaults if absent.
        #[arg(long)]
        config: Option<PathBuf>,
        /// How long to run before stopping.
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all().await,
        Command::DailyQuota => daily_quota::run_scenario().await,
        Command::AuthRejected => auth_rejected::run_scenario().await,
        Command::BusinessHours => business_hours::run_scenario().await,
        Command::PauseResume => pause_resume::run_scenario().await,
        Command::Simulate { config, seconds } => simulate(config, seconds).await,
    };

    match result {
        Ok(()) => {
            println!("All selected runs completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Runs ──────────────────────────────────────────────────────────────────────

async fn run_all() -> ScenarioResult<()> {
    daily_quota::run_scenario().await?;
    auth_rejected::run_scenario().await?;
    business_hours::run_scenario().await?;
    pause_resume::run_scenario().await?;
    Ok(())
}

async fn simulate(config: Option<PathBuf>, seconds: u64) -> ScenarioResult<()> {
    let (store_config, settings) = match &config {
        Some(path) => (StoreConfig::from_file(path)?, EngineSettings::from_file(path)?),
        None => (
            StoreConfig::from_toml_str(DEFAULT_CONFIG)?,
            EngineSettings::from_toml_str(DEFAULT_CONFIG)?,
        ),
    };
    info!(config = ?config, seconds, "starting simulation");

    println!("=== Simulation: {}s on the wall clock ===", seconds);
    println!();
    let report = run_simulation(store_config, settings, Duration::from_secs(seconds)).await?;

    println!();
    println!("  Final status:     {}", report.state.status);
    println!("  Dispatches:       {}", report.dispatches);
    println!("  Connections sent: {}", report.summary.connections_sent);
    println!("  Messages sent:    {}", report.summary.messages_sent);
    println!("  Retries:          {}", report.summary.retries);
    println!("  Failures:         {}", report.summary.failures);
    println!("  Deferred:         {}", report.deferred);
    println!(
        "  Activity chain:   {} ({} entries)",
        if report.chain_verified { "VERIFIED" } else { "FAILED" },
        report.summary.total
    );
    println!();
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Cadence: Outreach Action Scheduling & Pacing");
    println!("Reference Runtime Demo");
    println!("=============================================");
    println!();
    println!("Per candidate action, the engine:");
    println!("  [1] Rolls the UTC day and reloads rate-limit and stealth documents");
    println!("  [2] Holds the action until business hours (weekends and lunch skipped)");
    println!("  [3] Checks the daily quota; a spent quota defers the action to tomorrow");
    println!("  [4] Waits a humanized delay, then dispatches with a sampled timing profile");
    println!("  [5] Records the outcome; transient failures retry with backoff");
    println!();
}
