//! Property-based tests for retry backoff

use chatping_offline::client::offline::{BackoffStrategy, RetryPolicy};
use proptest::prelude::*;
use std::time::Duration;

fn exponential(jitter: f64) -> RetryPolicy {
    RetryPolicy::new(BackoffStrategy::Exponential {
        base_interval: 1,
        max_interval: 300,
        jitter,
    })
}

proptest! {
    #[test]
    fn test_delay_is_bounded(attempt in 1u32..200, seed in any::<u64>(), jitter in 0.0f64..1.0) {
        let delay = exponential(jitter).delay_for(attempt, seed);
        prop_assert!(delay >= Duration::from_secs(1));
        prop_assert!(delay <= Duration::from_secs(300).mul_f64(1.0 + jitter) + Duration::from_millis(1));
    }

    #[test]
    fn test_delay_is_stable_per_seed(attempt in 0u32..64, seed in any::<u64>()) {
        let policy = exponential(0.5);
        prop_assert_eq!(policy.delay_for(attempt, seed), policy.delay_for(attempt, seed));
    }

    #[test]
    fn test_delay_grows_without_jitter(attempt in 1u32..40) {
        let policy = exponential(0.0);
        prop_assert!(policy.delay_for(attempt + 1, 7) >= policy.delay_for(attempt, 7));
    }
}
