use std::time::{Duration, Instant};

const INITIAL_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(8);

/// Exponential backoff for silent reconnect attempts while the link is closed.
///
/// The first attempt is allowed immediately, each failure doubles the wait up
/// to `max`, and a success resets the schedule.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
    delay: Duration,
    next_attempt: Option<Instant>,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(INITIAL_DELAY, MAX_DELAY)
    }
}

impl ReconnectBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        ReconnectBackoff { initial, max, delay: initial, next_attempt: None }
    }

    /// Whether an attempt may be made at `now`
    pub fn ready(&self, now: Instant) -> bool {
        self.next_attempt.map_or(true, |at| now >= at)
    }

    /// Record a failed attempt made at `now`
    pub fn failed(&mut self, now: Instant) {
        self.next_attempt = Some(now + self.delay);
        self.delay = (self.delay * 2).min(self.max);
    }

    pub fn reset(&mut self) {
        self.delay = self.initial;
        self.next_attempt = None;
    }

    /// Wait that the next failure will schedule
    pub fn current_delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_is_immediate() {
        let backoff = ReconnectBackoff::default();
        assert!(backoff.ready(Instant::now()));
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let mut backoff = ReconnectBackoff::default();
        let start = Instant::now();
        let mut expected = Vec::new();
        for _ in 0..7 {
            expected.push(backoff.current_delay());
            backoff.failed(start);
        }
        let ms: Vec<u128> = expected.iter().map(Duration::as_millis).collect();
        assert_eq!(ms, vec![500, 1000, 2000, 4000, 8000, 8000, 8000]);
    }

    #[test]
    fn test_waits_until_deadline() {
        let mut backoff = ReconnectBackoff::default();
        let start = Instant::now();
        backoff.failed(start);
        assert!(!backoff.ready(start + Duration::from_millis(499)));
        assert!(backoff.ready(start + Duration::from_millis(500)));

        backoff.failed(start + Duration::from_millis(500));
        assert!(!backoff.ready(start + Duration::from_millis(1499)));
        assert!(backoff.ready(start + Duration::from_millis(1500)));
    }

    #[test]
    fn test_reset() {
        let mut backoff = ReconnectBackoff::default();
        let start = Instant::now();
        backoff.failed(start);
        backoff.failed(start);
        backoff.reset();
        assert!(backoff.ready(start));
        assert_eq!(backoff.current_delay(), INITIAL_DELAY);
    }
}
