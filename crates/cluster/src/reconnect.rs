//! Exponential-backoff policy for re-opening workload subscriptions.
//!
//! When a status subscription closes before the workload reached a
//! terminal state, the [`CompletionWatcher`](crate::watcher::CompletionWatcher)
//! asks a [`Backoff`] for the next delay. Once the attempt budget is
//! spent, the backoff yields `None` and the watch is reported lost.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Consecutive reconnection attempts allowed before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Attempt counter plus current delay for one watch.
#[derive(Debug)]
pub struct Backoff<'a> {
    config: &'a ReconnectConfig,
    attempt: u32,
    delay: Duration,
}

impl<'a> Backoff<'a> {
    pub fn new(config: &'a ReconnectConfig) -> Self {
        Self {
            config,
            attempt: 0,
            delay: config.initial_delay,
        }
    }

    /// Consume one attempt and return the delay to wait before it, or
    /// `None` once the budget is spent.
    pub fn next_attempt(&mut self) -> Option<Duration> {
        if self.attempt >= self.config.max_attempts {
            return None;
        }
        self.attempt += 1;
        let delay = self.delay;
        self.delay = next_delay(self.delay, self.config);
        Some(delay)
    }

    /// Restore the full budget after a subscription made progress.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.delay = self.config.initial_delay;
    }

    /// Attempts consumed since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

/// Sleep for `delay` unless `cancel` fires first.
///
/// Returns `false` if cancelled.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let config = ReconnectConfig::default();
        let d = next_delay(Duration::from_secs(1), &config);
        assert_eq!(d, Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(8), &config);
        assert_eq!(d, Duration::from_secs(10));
    }

    #[test]
    fn custom_multiplier() {
        let config = ReconnectConfig {
            multiplier: 3.0,
            max_delay: Duration::from_secs(60),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(2), &config);
        assert_eq!(d, Duration::from_secs(6));
    }

    #[test]
    fn backoff_sequence_until_budget_spent() {
        let config = ReconnectConfig {
            max_attempts: 7,
            ..Default::default()
        };
        let mut backoff = Backoff::new(&config);
        let expected = [1, 2, 4, 8, 16, 30, 30];

        for &expected_secs in &expected {
            assert_eq!(backoff.next_attempt(), Some(Duration::from_secs(expected_secs)));
        }
        assert_eq!(backoff.next_attempt(), None);
        assert_eq!(backoff.attempts(), 7);
    }

    #[test]
    fn zero_budget_gives_up_immediately() {
        let config = ReconnectConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(Backoff::new(&config).next_attempt(), None);
    }

    #[test]
    fn reset_restores_budget_and_delay() {
        let config = ReconnectConfig {
            max_attempts: 2,
            ..Default::default()
        };
        let mut backoff = Backoff::new(&config);
        backoff.next_attempt();
        backoff.next_attempt();
        assert_eq!(backoff.next_attempt(), None);

        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_attempt(), Some(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn cancellation_interrupts_sleep() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let slept = sleep_or_cancel(Duration::from_secs(3600), &cancel).await;
        assert!(!slept);
    }
}
