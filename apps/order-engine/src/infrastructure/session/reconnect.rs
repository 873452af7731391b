//! Reconnection Policy with Exponential Backoff and Jitter

use std::time::Duration;

use rand::Rng;

use crate::config::ReconnectConfig;

/// Reconnection policy with exponential backoff and full jitter.
///
/// Implements the "Full Jitter" algorithm recommended by AWS:
/// <https://aws.amazon.com/blogs/architecture/exponential-backoff-and-jitter/>
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
    max_attempts: u32,
    current_attempt: u32,
}

impl ReconnectPolicy {
    /// Create a new reconnect policy from configuration.
    #[must_use]
    pub const fn new(config: &ReconnectConfig) -> Self {
        Self::with_params(
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
            config.multiplier,
            config.max_attempts,
        )
    }

    /// Create with custom parameters.
    #[must_use]
    pub const fn with_params(
        initial_backoff: Duration,
        max_backoff: Duration,
        multiplier: f64,
        max_attempts: u32,
    ) -> Self {
        Self {
            initial_backoff,
            max_backoff,
            multiplier,
            max_attempts,
            current_attempt: 0,
        }
    }

    /// Calculate the next backoff duration with jitter.
    ///
    /// Returns `None` once max attempts have been used.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.max_attempts {
            return None;
        }

        let base_ms = self.initial_backoff.as_millis() as f64;
        let exponential = base_ms
            * self
                .multiplier
                .powi(i32::try_from(self.current_attempt).unwrap_or(i32::MAX));
        let capped = exponential.min(self.max_backoff.as_millis() as f64);

        // Full jitter: random value between 0 and capped
        let jitter = if capped > 0.0 {
            rand::rng().random_range(0.0..capped)
        } else {
            0.0
        };

        self.current_attempt += 1;
        Some(Duration::from_millis(jitter as u64))
    }

    /// Reset the policy after a successful connection.
    pub const fn reset(&mut self) {
        self.current_attempt = 0;
    }

    /// Get the current attempt count.
    #[must_use]
    pub const fn current_attempt(&self) -> u32 {
        self.current_attempt
    }

    /// Check if reconnection should be attempted.
    #[must_use]
    pub const fn should_reconnect(&self) -> bool {
        self.current_attempt < self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(&ReconnectConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_follow_config() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.current_attempt(), 0);
        assert!(policy.should_reconnect());
    }

    #[test]
    fn backoff_grows_within_bounds() {
        let mut policy = ReconnectPolicy::with_params(
            Duration::from_millis(100),
            Duration::from_secs(10),
            2.0,
            5,
        );

        assert!(policy.next_backoff().unwrap() <= Duration::from_millis(100));
        assert!(policy.next_backoff().unwrap() <= Duration::from_millis(200));
        assert_eq!(policy.current_attempt(), 2);
    }

    #[test]
    fn exhausted_policy_stops_until_reset() {
        let mut policy =
            ReconnectPolicy::with_params(Duration::from_millis(100), Duration::from_secs(1), 2.0, 3);

        for _ in 0..3 {
            assert!(policy.next_backoff().is_some());
        }
        assert!(policy.next_backoff().is_none());
        assert!(!policy.should_reconnect());

        policy.reset();
        assert!(policy.next_backoff().is_some());
    }

    #[test]
    fn zero_backoff_does_not_panic() {
        let mut policy = ReconnectPolicy::with_params(Duration::ZERO, Duration::ZERO, 2.0, 2);
        assert_eq!(policy.next_backoff(), Some(Duration::ZERO));
    }

    proptest! {
        #[test]
        fn backoff_never_exceeds_cap(initial in 1u64..5_000, cap in 1u64..60_000, attempts in 1u32..20) {
            let mut policy = ReconnectPolicy::with_params(
                Duration::from_millis(initial),
                Duration::from_millis(cap),
                2.0,
                attempts,
            );
            while let Some(backoff) = policy.next_backoff() {
                prop_assert!(backoff <= Duration::from_millis(cap));
            }
        }
    }
}
