//! Retry delay policy.

use std::time::Duration;

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub delay: Duration,
    /// Ceiling on any single delay.
    pub max_delay: Duration,
    /// Growth per attempt. `1.0` gives a fixed cadence.
    pub backoff_multiplier: f64,
    /// Maximum consecutive retries (`None` = unlimited)
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 1.0,
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let secs = self.delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs < 0.0 || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}

/// Counts consecutive failures and hands out the next delay.
///
/// Owns no timer; the connection manager schedules the retry.
#[derive(Debug, Clone)]
pub struct ReconnectScheduler {
    config: ReconnectConfig,
    attempts: u32,
}

impl ReconnectScheduler {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` once attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.config.max_attempts {
            if self.attempts >= max {
                return None;
            }
        }
        let delay = self.config.delay_for_attempt(self.attempts);
        self.attempts = self.attempts.saturating_add(1);
        Some(delay)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
