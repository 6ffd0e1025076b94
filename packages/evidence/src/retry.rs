//! Exponential backoff for transient provider errors.

use std::time::Duration;

use crate::error::EvidenceError;

/// How many times a call is attempted and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Default::default()
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Whether another attempt is allowed after `attempt` failed with `error`.
    pub fn should_retry(&self, attempt: u32, error: &EvidenceError) -> bool {
        attempt < self.max_attempts && error.is_transient()
    }

    /// Delay before the attempt following `attempt` (1-based).
    ///
    /// Doubles per attempt, honours a provider `Retry-After` hint when it is
    /// longer, and never exceeds `max_delay`.
    pub fn delay_for(&self, attempt: u32, error: &EvidenceError) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1u32 << exponent);
        let hinted = match error {
            EvidenceError::RateLimited {
                retry_after: Some(after),
                ..
            } => backoff.max(*after),
            _ => backoff,
        };
        hinted.min(self.max_delay)
    }
}
