//! # cadence-humanize
//!
//! Seeded randomness for human-looking pacing.
//!
//! [`HumanizationSampler`] is the single source of randomness in the engine:
//! per-action delays, occasional breaks, cooldowns after bulk streaks or
//! platform push-back, retry jitter, and the interaction timing profile
//! attached to each dispatch. The profile builders in [`typing`] and
//! [`motion`] are generic over any `Rng` so actuators can use them directly.

pub mod distributions;
pub mod motion;
pub mod sampler;
pub mod typing;

pub use sampler::HumanizationSampler;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cadence_contracts::{
        action::{ActionKind, PendingAction},
        config::{RateLimitConfig, StealthConfig},
    };
    use cadence_policy::settings::HumanizeSettings;

    use crate::HumanizationSampler;

    fn seeded(seed: u64) -> HumanizationSampler {
        HumanizationSampler::new(HumanizeSettings {
            seed: Some(seed),
            ..HumanizeSettings::default()
        })
    }

    // ── Action delay ──────────────────────────────────────────────────────────

    #[test]
    fn ten_thousand_delays_stay_in_range() {
        let rate = RateLimitConfig::default();
        let mut sampler = seeded(42);
        for _ in 0..10_000 {
            let d = sampler.action_delay(&rate);
            assert!(
                d >= Duration::from_millis(5_000) && d <= Duration::from_millis(15_000),
                "delay {d:?} outside [5000, 15000]ms"
            );
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let rate = RateLimitConfig::default();
        let mut a = seeded(7);
        let mut b = seeded(7);
        let xs: Vec<Duration> = (0..50).map(|_| a.action_delay(&rate)).collect();
        let ys: Vec<Duration> = (0..50).map(|_| b.action_delay(&rate)).collect();
        assert_eq!(xs, ys);
        assert_eq!(a.seed(), 7);
    }

    #[test]
    fn equal_bounds_give_constant_delay() {
        let rate = RateLimitConfig {
            min_action_delay_ms: 0,
            max_action_delay_ms: 0,
            ..RateLimitConfig::default()
        };
        assert_eq!(seeded(1).action_delay(&rate), Duration::ZERO);
    }

    // ── Breaks ────────────────────────────────────────────────────────────────

    #[test]
    fn breaks_require_break_patterns() {
        let mut sampler = HumanizationSampler::new(HumanizeSettings {
            seed: Some(1),
            break_probability: 1.0,
            ..HumanizeSettings::default()
        });
        let off = StealthConfig {
            include_break_patterns: false,
            ..StealthConfig::default()
        };
        assert!(sampler.break_pause(&off).is_none());

        let pause = sampler.break_pause(&StealthConfig::default()).unwrap();
        assert!(pause >= Duration::from_millis(120_000) && pause <= Duration::from_millis(600_000));
    }

    #[test]
    fn breaks_require_some_randomness() {
        let mut sampler = HumanizationSampler::new(HumanizeSettings {
            seed: Some(1),
            break_probability: 1.0,
            ..HumanizeSettings::default()
        });
        let flat = StealthConfig {
            bezier_enabled: false,
            typo_probability: 0.0,
            scroll_back_probability: 0.0,
            ..StealthConfig::default()
        };
        assert!(sampler.break_pause(&flat).is_none());
    }

    // ── Cooldowns ─────────────────────────────────────────────────────────────

    #[test]
    fn bulk_cooldown_after_threshold() {
        let mut sampler = HumanizationSampler::new(HumanizeSettings {
            seed: Some(3),
            bulk_threshold: 3,
            ..HumanizeSettings::default()
        });
        let stealth = StealthConfig::default();
        assert!(sampler.record_success(&stealth).is_none());
        assert!(sampler.record_success(&stealth).is_none());
        let cooldown = sampler.record_success(&stealth).unwrap();
        assert!(cooldown >= Duration::from_millis(600_000));
        assert_eq!(sampler.consecutive_successes(), 0);
    }

    #[test]
    fn failure_resets_the_streak() {
        let mut sampler = HumanizationSampler::new(HumanizeSettings {
            seed: Some(3),
            bulk_threshold: 2,
            ..HumanizeSettings::default()
        });
        let stealth = StealthConfig::default();
        assert!(sampler.record_success(&stealth).is_none());
        sampler.record_failure();
        assert!(sampler.record_success(&stealth).is_none());
    }

    #[test]
    fn no_bulk_cooldown_when_disabled() {
        let mut sampler = HumanizationSampler::new(HumanizeSettings {
            seed: Some(3),
            bulk_threshold: 1,
            ..HumanizeSettings::default()
        });
        let stealth = StealthConfig {
            cooldown_after_bulk: false,
            ..StealthConfig::default()
        };
        for _ in 0..5 {
            assert!(sampler.record_success(&stealth).is_none());
        }
    }

    #[test]
    fn platform_cooldown_within_jitter() {
        let mut sampler = seeded(9);
        for _ in 0..200 {
            let c = sampler.platform_cooldown();
            assert!(c >= Duration::from_millis(1_440_000) && c <= Duration::from_millis(2_160_000));
        }
    }

    #[test]
    fn backoff_jitter_bounds() {
        let mut sampler = seeded(9);
        for _ in 0..200 {
            let d = sampler.backoff_jitter(Duration::from_millis(4_000), 0.5);
            assert!(d >= Duration::from_millis(2_000) && d <= Duration::from_millis(6_000));
        }
    }

    // ── Interaction profile ───────────────────────────────────────────────────

    #[test]
    fn connect_profile_scrolls_and_moves() {
        let mut sampler = seeded(12);
        let action = PendingAction::new(ActionKind::Connect, "https://example.test/in/ada", None);
        let profile = sampler.interaction_profile(&action, &StealthConfig::default());
        assert!((2_000..=5_000).contains(&profile.think_time_ms));
        assert!(profile.movement.is_some());
        assert!(!profile.scroll.is_empty());
        assert!(profile.typing.is_empty());
    }

    #[test]
    fn follow_up_profile_does_not_scroll() {
        let mut sampler = seeded(12);
        let action = PendingAction::new(ActionKind::FollowUp, "conn-1", None);
        let profile = sampler.interaction_profile(&action, &StealthConfig::default());
        assert!(profile.scroll.is_empty());
    }
}
