//! Exponential backoff for transient dispatch failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry schedule for transient failures.
///
/// The delay before retry `n` (1-based) is `base_delay_ms · 2^(n-1)` capped at
/// `max_delay_ms`; the sampler then applies `±jitter_fraction` to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total dispatch attempts per action, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_fraction: 0.5,
        }
    }
}

impl RetryPolicy {
    /// Whether an action that has failed `attempts` times may be tried again.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Un-jittered delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(32);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}
