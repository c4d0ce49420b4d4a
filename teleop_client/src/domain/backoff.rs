use std::time::Duration;

// Retry timing for the socket transport. Retries are unlimited; only the delay is capped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(3),
            max: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl BackoffPolicy {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            // A cap below the first delay would make the first delay the cap.
            max: max.max(initial),
            ..Self::default()
        }
    }

    pub fn start(&self) -> Backoff {
        Backoff {
            policy: *self,
            attempts: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempts: u32,
}

impl Backoff {
    // Delay before the next attempt; grows by the multiplier until it hits the cap.
    pub fn next_delay(&mut self) -> Duration {
        let factor = self.policy.multiplier.powi(self.attempts.min(32) as i32);
        let secs = (self.policy.initial.as_secs_f64() * factor).min(self.policy.max.as_secs_f64());
        let delay = Duration::try_from_secs_f64(secs)
            .unwrap_or(self.policy.max)
            .min(self.policy.max);
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_attempts_repeat_then_delay_doubles_up_to_cap() {
        let mut backoff = BackoffPolicy::new(Duration::from_secs(3), Duration::from_secs(20)).start();

        assert_eq!(backoff.next_delay(), Duration::from_secs(3));
        assert_eq!(backoff.next_delay(), Duration::from_secs(6));
        assert_eq!(backoff.next_delay(), Duration::from_secs(12));
        assert_eq!(backoff.next_delay(), Duration::from_secs(20));
        assert_eq!(backoff.next_delay(), Duration::from_secs(20));
        assert_eq!(backoff.attempts(), 5);
    }

    #[test]
    fn when_reset_then_delay_starts_over() {
        let mut backoff = BackoffPolicy::default().start();
        backoff.next_delay();
        backoff.next_delay();

        backoff.reset();

        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(3));
    }

    #[test]
    fn when_many_attempts_then_delay_stays_capped() {
        let mut backoff = BackoffPolicy::default().start();

        let last = (0..200).map(|_| backoff.next_delay()).last();

        assert_eq!(last, Some(Duration::from_secs(30)));
    }

    #[test]
    fn when_cap_is_below_initial_then_initial_is_used() {
        let policy = BackoffPolicy::new(Duration::from_secs(5), Duration::from_secs(1));

        assert_eq!(policy.start().next_delay(), Duration::from_secs(5));
    }
}
