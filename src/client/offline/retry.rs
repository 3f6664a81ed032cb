//! # Retry Logic and Backoff Strategies
//!
//! Decides whether a failed queue item is due for another attempt in the
//! current reconciliation cycle. Items are never dropped; a failing item just
//! waits longer between attempts.
//!
//! ## Features
//!
//! - **Exponential Backoff**: `base * 2^(attempt - 1)`, capped at the maximum
//! - **Jitter**: up to `jitter * delay` extra, stable per item and attempt
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatping_offline::client::offline::retry::RetryPolicy;
//! use chatping_offline::shared::config::RetryConfig;
//! use chatping_offline::shared::{Category, SyncQueueItem};
//!
//! let policy = RetryPolicy::from_config(&RetryConfig::default());
//! let item = SyncQueueItem::new(Category::Attendance, serde_json::json!({}));
//! assert!(policy.is_due(&item, chrono::Utc::now()));
//! ```

use crate::shared::config::RetryConfig;
use crate::shared::SyncQueueItem;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Backoff strategy configuration
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed interval between retries
    Fixed {
        /// Interval in seconds
        interval_seconds: u64,
    },
    /// Exponential backoff with jitter
    Exponential {
        /// Base interval in seconds
        base_interval: u64,
        /// Maximum interval in seconds
        max_interval: u64,
        /// Jitter factor (0.0 to 1.0)
        jitter: f64,
    },
}

/// Retry policy for queued mutations
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    strategy: BackoffStrategy,
}

impl RetryPolicy {
    pub fn new(strategy: BackoffStrategy) -> Self {
        Self { strategy }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(BackoffStrategy::Exponential {
            base_interval: config.base_interval_secs,
            max_interval: config.max_interval_secs,
            jitter: config.jitter,
        })
    }

    /// Every failed item is retried on the next cycle
    pub fn immediate() -> Self {
        Self::new(BackoffStrategy::Fixed { interval_seconds: 0 })
    }

    pub fn strategy(&self) -> &BackoffStrategy {
        &self.strategy
    }

    /// Delay to wait after `attempt` failures
    ///
    /// `seed` keeps the jitter stable across repeated checks of one item.
    pub fn delay_for(&self, attempt: u32, seed: u64) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        match &self.strategy {
            BackoffStrategy::Fixed { interval_seconds } => Duration::from_secs(*interval_seconds),
            BackoffStrategy::Exponential {
                base_interval,
                max_interval,
                jitter,
            } => {
                let exponent = attempt.saturating_sub(1).min(32);
                let delay = base_interval
                    .saturating_mul(2u64.saturating_pow(exponent))
                    .min(*max_interval);
                let delay = Duration::from_secs(delay);

                if *jitter <= 0.0 {
                    return delay;
                }
                let mut rng = StdRng::seed_from_u64(seed ^ u64::from(attempt));
                let factor: f64 = rng.gen_range(0.0..=*jitter);
                let extra =
                    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX);
                delay.saturating_add(extra)
            }
        }
    }

    /// Whether `item` should be attempted at `now`
    pub fn is_due(&self, item: &SyncQueueItem, now: DateTime<Utc>) -> bool {
        let Some(last_attempt) = item.last_attempt else {
            return true;
        };

        // A delay past chrono's range means the item is never due
        let delay = self.delay_for(item.retry_count, item.id as u64);
        chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delay| last_attempt.checked_add_signed(delay))
            .is_some_and(|due| due <= now)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
