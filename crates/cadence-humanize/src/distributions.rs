//! Small sampling helpers shared by the sampler and the profile builders.

use std::f64::consts::PI;

use rand::Rng;

/// Uniform integer in `[min, max]`; returns `min` when the range is inverted.
pub fn uniform_ms<R: Rng + ?Sized>(rng: &mut R, min: u64, max: u64) -> u64 {
    if min >= max {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Normal sample with mean at the midpoint of `[min, max]` and standard
/// deviation a quarter of the range, clamped to the range (Box–Muller).
pub fn clamped_normal_ms<R: Rng + ?Sized>(rng: &mut R, min: u64, max: u64) -> u64 {
    if min >= max {
        return min;
    }
    let mean = (min as f64 + max as f64) / 2.0;
    let std_dev = (max - min) as f64 / 4.0;

    // 1 - u keeps the log argument in (0, 1].
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();

    (mean + z * std_dev).round().clamp(min as f64, max as f64) as u64
}

/// `value · (1 ± fraction)`, uniformly. `fraction` is clamped to `[0, 1]`.
pub fn jitter_ms<R: Rng + ?Sized>(rng: &mut R, value: u64, fraction: f64) -> u64 {
    let fraction = fraction.clamp(0.0, 1.0);
    if fraction == 0.0 || value == 0 {
        return value;
    }
    let factor = 1.0 + rng.gen_range(-fraction..=fraction);
    (value as f64 * factor).round().max(0.0) as u64
}

/// Bernoulli trial that tolerates out-of-range probabilities.
pub fn chance<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    if probability <= 0.0 {
        return false;
    }
    rng.gen_bool(probability.min(1.0))
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn clamped_normal_stays_in_range_and_centres() {
        let mut rng = StdRng::seed_from_u64(3);
        let samples: Vec<u64> = (0..5_000).map(|_| clamped_normal_ms(&mut rng, 1_000, 3_000)).collect();
        assert!(samples.iter().all(|s| (1_000..=3_000).contains(s)));
        let mean = samples.iter().sum::<u64>() as f64 / samples.len() as f64;
        assert!((mean - 2_000.0).abs() < 50.0, "mean drifted to {mean}");
    }

    #[test]
    fn degenerate_ranges_return_min() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(uniform_ms(&mut rng, 7, 7), 7);
        assert_eq!(clamped_normal_ms(&mut rng, 9, 2), 9);
    }

    #[test]
    fn jitter_is_bounded() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1_000 {
            let v = jitter_ms(&mut rng, 10_000, 0.5);
            assert!((5_000..=15_000).contains(&v));
        }
        assert_eq!(jitter_ms(&mut rng, 10_000, 0.0), 10_000);
    }

    #[test]
    fn chance_extremes() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(!chance(&mut rng, 0.0));
        assert!(chance(&mut rng, 1.0));
        assert!(chance(&mut rng, 4.0));
    }
}
