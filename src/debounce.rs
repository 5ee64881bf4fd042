//! Cancel-and-restart delay for search input.
//!
//! Single threaded: the caller feeds inputs and polls with the current
//! instant, so no timers or threads are involved.

use std::time::{Duration, Instant};

/// Holds the latest input until `delay` has passed without a newer one.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a new input, replacing any pending one and restarting the delay.
    pub fn input(&mut self, value: T, now: Instant) {
        self.pending = Some((now + self.delay, value));
    }

    /// Take the pending value if its delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((due, _)) if now >= *due => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    /// When the pending value becomes ready, if any.
    pub fn due_at(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(due, _)| *due)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending value without firing.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_delay() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(300));
        d.input("a", start);

        assert_eq!(d.poll(start + Duration::from_millis(299)), None);
        assert_eq!(d.poll(start + Duration::from_millis(300)), Some("a"));
        assert!(!d.is_pending());
        assert_eq!(d.poll(start + Duration::from_millis(900)), None);
    }

    #[test]
    fn test_new_input_restarts() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(300));
        d.input("a", start);
        d.input("ab", start + Duration::from_millis(200));

        assert_eq!(d.poll(start + Duration::from_millis(400)), None);
        assert_eq!(d.due_at(), Some(start + Duration::from_millis(500)));
        assert_eq!(d.poll(start + Duration::from_millis(500)), Some("ab"));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(10));
        d.input(1, start);
        assert_eq!(d.cancel(), Some(1));
        assert_eq!(d.poll(start + Duration::from_secs(1)), None);
    }
}
