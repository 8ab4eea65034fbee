use std::time::Duration;

/// Exponential delay between voice connect attempts, capped at 8x the base.
pub(crate) struct Backoff {
    attempt: u32,
    base_ms: u64,
    max_attempts: u32,
}

impl Backoff {
    pub(crate) fn new(base_ms: u64, max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            base_ms,
            max_attempts: max_attempts.max(1),
        }
    }

    pub(crate) fn next(&mut self) -> Duration {
        self.attempt += 1;
        let delay = self.base_ms * 2u64.pow((self.attempt - 1).min(3));
        Duration::from_millis(delay)
    }

    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_then_cap() {
        let mut backoff = Backoff::new(100, 10);
        let delays: Vec<u64> = (0..6).map(|_| backoff.next().as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 800, 800]);
    }

    #[test]
    fn test_exhaustion() {
        let mut backoff = Backoff::new(1, 2);
        assert!(!backoff.is_exhausted());
        backoff.next();
        backoff.next();
        assert!(backoff.is_exhausted());

        assert!(Backoff::new(1, 0).max_attempts == 1);
    }
}
