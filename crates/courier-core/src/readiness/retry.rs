//! Retry policy: decides backoff delays.

use std::time::Duration;

/// Backoff policy for operations that fail because the dependency is not ready.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound for a single delay.
    pub max_delay: Duration,

    /// Retries allowed after the first call.
    pub max_retries: u32,
}

impl RetryPolicy {
    /// Calculate the delay before retry number `attempt` (1-indexed).
    ///
    /// delay = min(base_delay * multiplier^(attempt - 1), max_delay)
    ///
    /// With the defaults (500ms, 2.0, cap 10s):
    /// - attempt 1: 500ms
    /// - attempt 2: 1s
    /// - attempt 3: 2s
    /// - attempt 4: 4s
    /// - attempt 5: 8s
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            max_retries: 5,
        }
    }
}
