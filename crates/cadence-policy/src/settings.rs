//! Engine settings loaded from a `cadence.toml` document.
//!
//! Unlike `RateLimitConfig` and `StealthConfig`, which the store owns and the
//! dashboard edits at runtime, these settings are fixed when the engine is
//! built: loop timing, retry schedule, humanization distributions and the
//! burst bucket size.
//!
//! ```toml
//! [engine]
//! poll_interval_ms = 30000
//! fatal_failure_threshold = 5
//!
//! [retry]
//! max_attempts = 5
//!
//! [humanize]
//! seed = 42
//! break_probability = 0.05
//!
//! [burst]
//! burst_capacity = 5
//! ```
//!
//! Every field has a default, so an empty document is valid.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use cadence_contracts::error::{CadenceError, CadenceResult};

use crate::retry::RetryPolicy;

/// Timing of the action loop itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// How long to wait when the store has no candidate.
    pub poll_interval_ms: u64,
    /// Upper bound on one actuator dispatch.
    pub dispatch_timeout_ms: u64,
    /// Upper bound on one store call.
    pub store_timeout_ms: u64,
    /// Long waits are re-evaluated at least this often.
    pub max_wait_chunk_ms: u64,
    /// Consecutive failed actions that put the engine into Error.
    pub fatal_failure_threshold: u32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 30_000,
            dispatch_timeout_ms: 120_000,
            store_timeout_ms: 10_000,
            max_wait_chunk_ms: 60_000,
            fatal_failure_threshold: 5,
        }
    }
}

impl LoopSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn max_wait_chunk(&self) -> Duration {
        Duration::from_millis(self.max_wait_chunk_ms.max(1))
    }
}

/// Distributions used by the humanization sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanizeSettings {
    /// Fixed RNG seed; a random one is drawn and logged when absent.
    pub seed: Option<u64>,
    pub break_probability: f64,
    pub break_min_ms: u64,
    pub break_max_ms: u64,
    /// Consecutive successes that trigger a bulk cooldown.
    pub bulk_threshold: u32,
    pub cooldown_min_ms: u64,
    pub cooldown_max_ms: u64,
    /// Base cooldown after the platform pushes back.
    pub platform_cooldown_ms: u64,
    /// Symmetric jitter applied to the platform cooldown.
    pub jitter_fraction: f64,
    pub think_time_min_ms: u64,
    pub think_time_max_ms: u64,
}

impl Default for HumanizeSettings {
    fn default() -> Self {
        Self {
            seed: None,
            break_probability: 0.05,
            break_min_ms: 120_000,
            break_max_ms: 600_000,
            bulk_threshold: 10,
            cooldown_min_ms: 600_000,
            cooldown_max_ms: 1_200_000,
            platform_cooldown_ms: 1_800_000,
            jitter_fraction: 0.2,
            think_time_min_ms: 2_000,
            think_time_max_ms: 5_000,
        }
    }
}

/// Token bucket sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstSettings {
    pub burst_capacity: u32,
}

impl Default for BurstSettings {
    fn default() -> Self {
        Self { burst_capacity: 5 }
    }
}

/// Root of `cadence.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub engine: LoopSettings,
    pub retry: RetryPolicy,
    pub humanize: HumanizeSettings,
    pub burst: BurstSettings,
}

impl EngineSettings {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `CadenceError::ConfigError` if the TOML is malformed, does not
    /// match the schema, or violates a range constraint.
    pub fn from_toml_str(s: &str) -> CadenceResult<Self> {
        let settings: EngineSettings = toml::from_str(s).map_err(|e| CadenceError::ConfigError {
            reason: format!("failed to parse engine settings TOML: {}", e),
        })?;
        settings.validate()?;
        debug!(
            poll_interval_ms = settings.engine.poll_interval_ms,
            max_attempts = settings.retry.max_attempts,
            seed = ?settings.humanize.seed,
            "engine settings loaded"
        );
        Ok(settings)
    }

    /// Read the file at `path` and parse it as engine settings.
    pub fn from_file(path: &Path) -> CadenceResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CadenceError::ConfigError {
            reason: format!("failed to read settings file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> CadenceResult<()> {
        let engine = &self.engine;
        if engine.poll_interval_ms == 0 || engine.dispatch_timeout_ms == 0 || engine.store_timeout_ms == 0 {
            return Err(invalid("engine intervals and timeouts must be positive"));
        }
        if engine.fatal_failure_threshold == 0 {
            return Err(invalid("fatal_failure_threshold must be at least 1"));
        }

        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts must be at least 1"));
        }
        if retry.base_delay_ms > retry.max_delay_ms {
            return Err(invalid("retry.base_delay_ms exceeds retry.max_delay_ms"));
        }
        if !(0.0..=1.0).contains(&retry.jitter_fraction) {
            return Err(invalid("retry.jitter_fraction must be within [0, 1]"));
        }

        let h = &self.humanize;
        if !(0.0..=1.0).contains(&h.break_probability) {
            return Err(invalid("humanize.break_probability must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&h.jitter_fraction) {
            return Err(invalid("humanize.jitter_fraction must be within [0, 1]"));
        }
        for (name, min, max) in [
            ("break", h.break_min_ms, h.break_max_ms),
            ("cooldown", h.cooldown_min_ms, h.cooldown_max_ms),
            ("think_time", h.think_time_min_ms, h.think_time_max_ms),
        ] {
            if min > max {
                return Err(invalid(format!("humanize.{name} range is inverted ({min} > {max})")));
            }
        }
        if h.bulk_threshold == 0 {
            return Err(invalid("humanize.bulk_threshold must be at least 1"));
        }

        if self.burst.burst_capacity == 0 {
            return Err(invalid("burst.burst_capacity must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> CadenceError {
    CadenceError::ConfigError { reason: reason.into() }
}
