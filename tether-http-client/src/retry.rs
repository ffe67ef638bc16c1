//! When and how long to wait before repeating an outbound call.

use crate::HttpClientError;
use std::time::Duration;

/// Longest pause between two attempts against a provider API.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Retry policy for outbound calls.
///
/// `max_attempts` counts the first call, so `1` disables retrying.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Statuses worth repeating; anything else is handed back to the caller as-is
    pub retry_on: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential {
                base: Duration::from_secs(1),
                cap: MAX_RETRY_DELAY,
            },
            retry_on: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential {
                base,
                cap: MAX_RETRY_DELAY,
            },
            ..Self::default()
        }
    }

    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear {
                step,
                cap: MAX_RETRY_DELAY,
            },
            ..Self::default()
        }
    }

    /// Same pause before every retry
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
            ..Self::default()
        }
    }

    pub fn retry_on(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retry_on = statuses.into_iter().collect();
        self
    }

    /// Pause after the given failed attempt (0 is the first call)
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.retry_on.contains(&status)
    }

    /// Status errors follow `retry_on`; other failures retry when transient
    pub fn retries_error(&self, error: &HttpClientError) -> bool {
        match error.status() {
            Some(status) => self.retries_status(status.as_u16()),
            None => error.is_transient(),
        }
    }
}

/// Growth of the pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    /// `step * (attempt + 1)`, never above `cap`
    Linear { step: Duration, cap: Duration },
    /// `base * 2^attempt`, never above `cap`
    Exponential { base: Duration, cap: Duration },
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Linear { step, cap } => step.saturating_mul(attempt.saturating_add(1)).min(cap),
            Self::Exponential { base, cap } => 2u32
                .checked_pow(attempt)
                .map_or(cap, |factor| base.saturating_mul(factor))
                .min(cap),
        }
    }
}
