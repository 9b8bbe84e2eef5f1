//! The seeded sampler owned by the engine actor.

use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info};

use cadence_contracts::{
    action::{ActionKind, PendingAction},
    config::{RateLimitConfig, StealthConfig},
    profile::InteractionProfile,
};
use cadence_policy::settings::HumanizeSettings;

use crate::{
    distributions::{chance, clamped_normal_ms, jitter_ms, uniform_ms},
    motion::{movement_profile, scroll_profile},
};

/// Source of every random wait and timing profile the engine uses.
///
/// All draws come from one `StdRng`, so a fixed seed reproduces a whole run.
#[derive(Debug)]
pub struct HumanizationSampler {
    rng: StdRng,
    seed: u64,
    settings: HumanizeSettings,
    consecutive_successes: u32,
}

impl HumanizationSampler {
    /// Build a sampler from `settings`, drawing and logging a seed if none is set.
    pub fn new(settings: HumanizeSettings) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        info!(seed, fixed = settings.seed.is_some(), "humanization sampler seeded");
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
            settings,
            consecutive_successes: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform delay in the configured action delay range.
    pub fn action_delay(&mut self, rate: &RateLimitConfig) -> Duration {
        Duration::from_millis(uniform_ms(
            &mut self.rng,
            rate.min_action_delay_ms,
            rate.max_action_delay_ms,
        ))
    }

    /// An occasional longer pause, as a person stepping away would take.
    pub fn break_pause(&mut self, stealth: &StealthConfig) -> Option<Duration> {
        if !stealth.include_break_patterns || !stealth.randomness_enabled() {
            return None;
        }
        if !chance(&mut self.rng, self.settings.break_probability) {
            return None;
        }
        let ms = clamped_normal_ms(&mut self.rng, self.settings.break_min_ms, self.settings.break_max_ms);
        debug!(break_ms = ms, "break pause sampled");
        Some(Duration::from_millis(ms))
    }

    /// Count a successful dispatch; returns a cooldown after a bulk streak.
    pub fn record_success(&mut self, stealth: &StealthConfig) -> Option<Duration> {
        self.consecutive_successes += 1;
        if !stealth.cooldown_after_bulk || self.consecutive_successes < self.settings.bulk_threshold {
            return None;
        }
        self.consecutive_successes = 0;
        let ms = uniform_ms(&mut self.rng, self.settings.cooldown_min_ms, self.settings.cooldown_max_ms);
        info!(cooldown_ms = ms, threshold = self.settings.bulk_threshold, "bulk cooldown");
        Some(Duration::from_millis(ms))
    }

    /// Break the success streak.
    pub fn record_failure(&mut self) {
        self.consecutive_successes = 0;
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    /// Extended cooldown after the platform signals rate limiting.
    pub fn platform_cooldown(&mut self) -> Duration {
        Duration::from_millis(jitter_ms(
            &mut self.rng,
            self.settings.platform_cooldown_ms,
            self.settings.jitter_fraction,
        ))
    }

    /// Symmetric jitter for a retry backoff delay.
    pub fn backoff_jitter(&mut self, delay: Duration, fraction: f64) -> Duration {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(jitter_ms(&mut self.rng, ms, fraction))
    }

    /// Pause before the first interaction on a page.
    pub fn think_time(&mut self) -> Duration {
        Duration::from_millis(uniform_ms(
            &mut self.rng,
            self.settings.think_time_min_ms,
            self.settings.think_time_max_ms,
        ))
    }

    /// Timing profile handed to the actuator with a dispatch.
    ///
    /// The engine never sees message text, so the profile carries think time,
    /// pointer movement to the action button, and scrolling through the
    /// profile page. Keystrokes are sampled by the actuator once it has
    /// rendered the note, via [`crate::typing::typing_profile`].
    pub fn interaction_profile(&mut self, action: &PendingAction, stealth: &StealthConfig) -> InteractionProfile {
        let think_time_ms = u64::try_from(self.think_time().as_millis()).unwrap_or(u64::MAX);
        let distance = self.rng.gen_range(150.0..900.0);
        let movement = movement_profile(&mut self.rng, distance, stealth);
        let scroll = match action.kind {
            ActionKind::Connect => {
                let depth = self.rng.gen_range(300..=1_500);
                scroll_profile(&mut self.rng, depth, stealth)
            }
            ActionKind::FollowUp => Vec::new(),
        };
        InteractionProfile {
            think_time_ms,
            movement,
            scroll,
            typing: Vec::new(),
        }
    }
}
