//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff bounds shared by the retry loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms: max_ms.max(base_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// `base * 2^(attempt-1)`, capped at `max`, plus up to 10% jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponential = 2u64.saturating_pow(attempt - 1);
        let capped = self.base_ms.saturating_mul(exponential).min(self.max_ms);

        let jitter_range = capped / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_growth() {
        let backoff = Backoff::new(100, 2000);
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert!(backoff.delay(1).as_millis() >= 100);
        assert!(backoff.delay(2).as_millis() >= 200);
        assert!(backoff.delay(3).as_millis() < 440);
    }

    #[test]
    fn test_backoff_capped() {
        let backoff = Backoff::new(100, 1000);
        let delay = backoff.delay(30).as_millis();
        assert!((1000..1100).contains(&delay));
    }

    #[test]
    fn test_max_never_below_base() {
        let backoff = Backoff::new(500, 10);
        assert!(backoff.delay(1).as_millis() >= 500);
    }
}
