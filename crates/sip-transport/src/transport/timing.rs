//! Randomized timer intervals
//!
//! Both the reconnection backoff and the keepalive cadence are drawn at
//! random so that many clients losing the same server do not come back, or
//! probe, in lockstep.

use std::time::Duration;

use rand::Rng;

use crate::config::RecoveryOptions;

/// Delay before reconnection attempt number `attempts`
///
/// Draws `k` uniformly from `[1, 2^attempts]` seconds and clamps it into
/// `[min_interval, max_interval]`.
pub fn reconnect_interval<R: Rng + ?Sized>(attempts: u32, recovery: &RecoveryOptions, rng: &mut R) -> Duration {
    let ceiling = 1u64 << attempts.min(32);
    let k = rng.gen_range(1..=ceiling);
    let k = k.max(recovery.min_interval_secs).min(recovery.max_interval_secs);
    Duration::from_secs(k)
}

/// Delay until the next keepalive probe, uniform in `[0.8, 1.0] * base`
pub fn keep_alive_interval<R: Rng + ?Sized>(base_secs: u64, rng: &mut R) -> Duration {
    let upper = base_secs as f64;
    let lower = upper * 0.8;
    Duration::from_secs_f64(rng.gen_range(lower..=upper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn reconnect_interval_stays_within_bounds() {
        let mut rng = SmallRng::seed_from_u64(11);
        let recovery = RecoveryOptions::default();
        for attempts in 0..64 {
            for _ in 0..50 {
                let interval = reconnect_interval(attempts, &recovery, &mut rng);
                assert!(interval >= recovery.min_interval(), "{:?} at attempt {}", interval, attempts);
                assert!(interval <= recovery.max_interval(), "{:?} at attempt {}", interval, attempts);
            }
        }
    }

    #[test]
    fn first_attempts_are_pinned_to_min_interval() {
        let mut rng = SmallRng::seed_from_u64(5);
        let recovery = RecoveryOptions::default();
        for _ in 0..100 {
            assert_eq!(reconnect_interval(1, &recovery, &mut rng), Duration::from_secs(2));
        }
    }

    #[test]
    fn mean_interval_grows_with_attempts() {
        let mut rng = SmallRng::seed_from_u64(99);
        let recovery = RecoveryOptions::default();
        let mean = |attempts: u32, rng: &mut SmallRng| {
            let total: u64 = (0..4000)
                .map(|_| reconnect_interval(attempts, &recovery, rng).as_secs())
                .sum();
            total as f64 / 4000.0
        };

        let means: Vec<f64> = (1..=8).map(|attempts| mean(attempts, &mut rng)).collect();
        for pair in means.windows(2) {
            // allow a little sampling noise once the ceiling is reached
            assert!(pair[1] + 0.5 >= pair[0], "means not growing: {:?}", means);
        }
        assert!(means[7] > means[1] * 3.0, "means barely grew: {:?}", means);
    }

    #[test]
    fn keep_alive_interval_is_jittered_below_base() {
        let mut rng = SmallRng::seed_from_u64(17);
        let mut seen_low = false;
        let mut seen_high = false;
        for _ in 0..1000 {
            let interval = keep_alive_interval(5, &mut rng);
            assert!(interval >= Duration::from_secs(4));
            assert!(interval <= Duration::from_secs(5));
            seen_low |= interval < Duration::from_millis(4300);
            seen_high |= interval > Duration::from_millis(4700);
        }
        assert!(seen_low && seen_high);
    }
}
