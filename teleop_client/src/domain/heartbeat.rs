use std::time::{Duration, Instant};

// Tracks whether heartbeats still arrive. Liveness is judged by local receipt time,
// not by the timestamp the game puts in the message.
#[derive(Debug, Clone)]
pub struct Liveness {
    timeout: Duration,
    last_beat: Option<Instant>,
}

impl Liveness {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_beat: None,
        }
    }

    pub fn record(&mut self, at: Instant) {
        self.last_beat = Some(at);
    }

    pub fn last_beat(&self) -> Option<Instant> {
        self.last_beat
    }

    // No beat yet means nothing to judge; the link counts as alive until one goes missing.
    pub fn is_alive(&self, now: Instant) -> bool {
        match self.last_beat {
            None => true,
            Some(last) => now.saturating_duration_since(last) <= self.timeout,
        }
    }

    pub fn reset(&mut self) {
        self.last_beat = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_no_beat_seen_then_alive() {
        let liveness = Liveness::new(Duration::from_secs(10));

        assert!(liveness.is_alive(Instant::now()));
    }

    #[test]
    fn when_beat_is_recent_then_alive() {
        let mut liveness = Liveness::new(Duration::from_secs(10));
        let start = Instant::now();
        liveness.record(start);

        assert!(liveness.is_alive(start + Duration::from_secs(10)));
    }

    #[test]
    fn when_beat_is_older_than_timeout_then_not_alive() {
        let mut liveness = Liveness::new(Duration::from_secs(10));
        let start = Instant::now();
        liveness.record(start);

        assert!(!liveness.is_alive(start + Duration::from_secs(11)));

        liveness.record(start + Duration::from_secs(11));
        assert!(liveness.is_alive(start + Duration::from_secs(12)));
    }
}
