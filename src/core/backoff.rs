//! Exponential back-off between delivery attempts of one batch

use super::config::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// A retry strategy driven by exponential back-off.
///
/// Each call to [`next_delay`](Self::next_delay) returns the current delay and
/// doubles it for the next call, never exceeding the configured maximum.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max_delay: Duration) -> Self {
        Self {
            current: initial,
            max_delay,
            jitter: false,
        }
    }

    /// Add up to 10% random extra delay so retries from many shippers spread out.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// The next `Duration` to wait for.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.max_delay);
        self.current = self.current.saturating_mul(2).min(self.max_delay);

        if self.jitter && !delay.is_zero() {
            let spread = (delay.as_millis() / 10) as u64;
            let extra = rand::thread_rng().gen_range(0..=spread);
            delay.saturating_add(Duration::from_millis(extra))
        } else {
            delay
        }
    }
}

impl From<&RetryConfig> for ExponentialBackoff {
    fn from(config: &RetryConfig) -> Self {
        ExponentialBackoff::new(config.initial_backoff, config.max_backoff).with_jitter(config.jitter)
    }
}
