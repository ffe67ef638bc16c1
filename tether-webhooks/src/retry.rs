//! Retry policy for webhook redelivery

use rand::Rng;
use std::time::Duration;

/// How the delay grows between retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffStrategy {
    /// `base * (n + 1)`
    Linear,

    /// `base * 2^n` plus up to 10% positive jitter
    #[default]
    Exponential,
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries; total attempts are `max_retries + 1`
    pub max_retries: u32,

    pub backoff: BackoffStrategy,

    /// Delay unit the strategy scales
    pub base_delay: Duration,

    /// Hard cap on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffStrategy::Exponential,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(60_000),
        }
    }
}

impl RetryPolicy {
    /// Create a policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Create a policy with linear backoff
    pub fn linear(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::Linear,
            base_delay,
            max_delay,
        }
    }

    /// Create a policy with exponential backoff
    pub fn exponential(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::Exponential,
            base_delay,
            max_delay,
        }
    }

    /// Delay before the retry with 0-based index `attempt`.
    ///
    /// Exponential delays carry fresh random jitter on every call.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self.backoff {
            BackoffStrategy::Linear => self
                .base_delay
                .saturating_mul(attempt.saturating_add(1))
                .min(self.max_delay),
            BackoffStrategy::Exponential => {
                let max_ms = self.max_delay.as_millis() as f64;
                let raw_ms = self.base_delay.as_millis() as f64 * 2f64.powi(attempt.min(63) as i32);
                if raw_ms >= max_ms {
                    return self.max_delay;
                }

                let jitter_ms = rand::rng().random_range(0.0..=raw_ms * 0.1);
                Duration::from_millis((raw_ms + jitter_ms).min(max_ms) as u64)
            }
        }
    }
}
