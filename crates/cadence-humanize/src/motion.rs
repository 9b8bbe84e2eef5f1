//! Pointer movement and scroll timing.

use rand::Rng;

use cadence_contracts::{
    config::StealthConfig,
    profile::{MovementProfile, ScrollStep},
};

use crate::distributions::{chance, uniform_ms};

const MIN_STEPS: u32 = 20;
const MAX_STEPS: u32 = 50;
/// Extra steps spent correcting back onto the target after an overshoot.
const OVERSHOOT_CORRECTION_STEPS: u32 = 3;

/// Per-step durations for a pointer path covering `distance_px`.
///
/// Step count follows Fitts's law (`10·log2(d+1)` with ±5 jitter, clamped to
/// 20–50). Steps are slower at both ends of the path. Returns `None` when
/// neither curved movement nor hovering is enabled, meaning the actuator
/// should click directly.
pub fn movement_profile<R: Rng + ?Sized>(
    rng: &mut R,
    distance_px: f64,
    stealth: &StealthConfig,
) -> Option<MovementProfile> {
    if !stealth.bezier_enabled && !stealth.hover_before_click {
        return None;
    }

    let hover_ms = if stealth.hover_before_click {
        uniform_ms(rng, 100, 500)
    } else {
        0
    };

    if !stealth.bezier_enabled {
        return Some(MovementProfile {
            step_durations_ms: Vec::new(),
            overshoot: false,
            hover_ms,
        });
    }

    let base = ((distance_px.max(0.0) + 1.0).log2() * 10.0) as i64;
    let steps = (base + rng.gen_range(-5..5)).clamp(i64::from(MIN_STEPS), i64::from(MAX_STEPS)) as u32;
    let total_ms = uniform_ms(rng, 400, 1_200) as f64;
    let base_interval = total_ms / f64::from(steps);

    let mut step_durations_ms: Vec<u64> = (0..steps)
        .map(|i| {
            let progress = f64::from(i) / f64::from(steps);
            let speed = if progress < 0.2 {
                0.5 + progress * 2.5
            } else if progress > 0.8 {
                0.5 + (1.0 - progress) * 2.5
            } else {
                1.0
            };
            let noise = rng.gen_range(0.8..=1.2);
            (base_interval / speed * noise).round().max(1.0) as u64
        })
        .collect();

    let overshoot = chance(rng, stealth.bezier_overshoot_probability);
    if overshoot {
        for _ in 0..OVERSHOOT_CORRECTION_STEPS {
            step_durations_ms.push(uniform_ms(rng, 20, 40));
        }
    }

    Some(MovementProfile {
        step_durations_ms,
        overshoot,
        hover_ms,
    })
}

/// Scroll increments covering `distance_px` (downwards when positive).
///
/// Increments are drawn from the configured scroll speed range with the same
/// ease-in/ease-out shape as pointer movement, with an occasional reading
/// pause and, with `scroll_back_probability`, a final scroll back and forth.
/// The deltas always sum to `distance_px`.
pub fn scroll_profile<R: Rng + ?Sized>(rng: &mut R, distance_px: i32, stealth: &StealthConfig) -> Vec<ScrollStep> {
    if distance_px == 0 {
        return Vec::new();
    }

    let direction = distance_px.signum();
    let total = distance_px.unsigned_abs();
    let min_speed = stealth.scroll_min_speed.max(1);
    let max_speed = stealth.scroll_max_speed.max(min_speed);

    let mut steps = Vec::new();
    let mut covered: u32 = 0;
    while covered < total {
        let speed = rng.gen_range(min_speed..=max_speed);
        let progress = f64::from(covered) / f64::from(total);
        let multiplier = if progress < 0.2 {
            0.3 + progress * 3.5
        } else if progress > 0.8 {
            0.3 + (1.0 - progress) * 3.5
        } else {
            1.0
        };
        let size = ((f64::from(speed) * multiplier) as u32).clamp(1, total - covered);
        covered += size;
        steps.push(ScrollStep {
            delta_px: direction * size as i32,
            duration_ms: uniform_ms(rng, 20, 49),
        });

        if chance(rng, 0.1) {
            steps.push(ScrollStep {
                delta_px: 0,
                duration_ms: uniform_ms(rng, 200, 499),
            });
        }
    }

    if chance(rng, stealth.scroll_back_probability) {
        let back = rng.gen_range(min_speed..=max_speed) as i32;
        steps.push(ScrollStep {
            delta_px: -direction * back,
            duration_ms: uniform_ms(rng, 50, 99),
        });
        steps.push(ScrollStep {
            delta_px: direction * back,
            duration_ms: uniform_ms(rng, 50, 99),
        });
    }

    steps
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn movement_step_count_is_clamped() {
        let stealth = StealthConfig {
            bezier_overshoot_probability: 0.0,
            ..StealthConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        for distance in [0.0, 10.0, 500.0, 1e9] {
            let profile = movement_profile(&mut rng, distance, &stealth).unwrap();
            let n = profile.step_durations_ms.len() as u32;
            assert!((MIN_STEPS..=MAX_STEPS).contains(&n), "{n} steps for {distance}px");
            assert!(!profile.overshoot);
        }
    }

    #[test]
    fn overshoot_adds_correction_steps() {
        let stealth = StealthConfig {
            bezier_overshoot_probability: 1.0,
            ..StealthConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let profile = movement_profile(&mut rng, 0.0, &stealth).unwrap();
        assert!(profile.overshoot);
        assert_eq!(profile.step_durations_ms.len() as u32, MIN_STEPS + OVERSHOOT_CORRECTION_STEPS);
    }

    #[test]
    fn movement_disabled_entirely() {
        let stealth = StealthConfig {
            bezier_enabled: false,
            hover_before_click: false,
            ..StealthConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(movement_profile(&mut rng, 300.0, &stealth).is_none());
    }

    #[test]
    fn hover_only_without_bezier() {
        let stealth = StealthConfig {
            bezier_enabled: false,
            ..StealthConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let profile = movement_profile(&mut rng, 300.0, &stealth).unwrap();
        assert!(profile.step_durations_ms.is_empty());
        assert!((100..=500).contains(&profile.hover_ms));
    }

    #[test]
    fn scroll_deltas_sum_to_distance() {
        let stealth = StealthConfig {
            scroll_back_probability: 1.0,
            ..StealthConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(8);
        for distance in [1, 250, 1_800, -640] {
            let steps = scroll_profile(&mut rng, distance, &stealth);
            assert_eq!(steps.iter().map(|s| s.delta_px).sum::<i32>(), distance);
            for step in &steps {
                assert!(step.delta_px.unsigned_abs() <= stealth.scroll_max_speed);
            }
        }
        assert!(scroll_profile(&mut rng, 0, &stealth).is_empty());
    }
}
