//! Retry policy for tasks that came back with `status = retry`.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Attempts allowed in total, the first execution included.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, given how many attempts were already made
    /// (1-indexed): `base_delay * multiplier^(attempts - 1)`.
    ///
    /// With base_delay=2s, multiplier=2.0: 2s, 4s, 8s, 16s, 32s.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// `None` once the attempt budget is spent.
    pub fn schedule(&self, attempts: u32) -> Option<Duration> {
        (attempts < self.max_attempts).then(|| self.next_delay(attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_has_reasonable_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay, Duration::from_secs(2));
        assert_eq!(policy.multiplier, 2.0);
        assert_eq!(policy.max_attempts, 5);
    }

    #[test]
    fn exponential_backoff_increases() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.next_delay(1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(2), Duration::from_secs(4));
        assert_eq!(policy.next_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };

        assert_eq!(policy.schedule(1), Some(Duration::from_secs(2)));
        assert_eq!(policy.schedule(2), Some(Duration::from_secs(4)));
        assert_eq!(policy.schedule(3), None);
    }

    #[test]
    fn huge_exponent_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(u32::MAX), Duration::MAX);
    }
}
