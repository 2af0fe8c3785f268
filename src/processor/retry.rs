//! Backoff between posting attempts.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Exponential backoff for items returned to `PENDING` after a failed post.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry. Zero makes retries eligible immediately.
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(600),
        }
    }
}

impl RetryPolicy {
    /// Failed items go straight back into the next batch.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry_count` (1 for the first retry):
    /// `base_delay * multiplier^(retry_count - 1)`, capped at `max_delay`.
    pub fn delay(&self, retry_count: i32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = retry_count.saturating_sub(1).max(0);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// When a retried item becomes eligible again, `None` meaning right away.
    pub fn next_attempt_at(&self, now: DateTime<Utc>, retry_count: i32) -> Option<DateTime<Utc>> {
        let delay = self.delay(retry_count);
        if delay.is_zero() {
            return None;
        }
        chrono::Duration::from_std(delay).ok().map(|d| now + d)
    }
}
