use std::time::{Duration, Instant};

/// Token bucket guarding a single socket's inbound messages.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    capacity: u32,
    refill_every: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    /// 20 messages up front, then one more every second.
    pub fn new() -> Self {
        Self::with_limits(20, Duration::from_secs(1))
    }

    pub fn with_limits(capacity: u32, refill_every: Duration) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_every,
            last_refill: Instant::now(),
        }
    }

    /// Take a token if one is available.
    pub fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }

    fn refill(&mut self) {
        let period = self.refill_every.as_millis().max(1);
        let elapsed = self.last_refill.elapsed().as_millis();
        let earned = elapsed / period;
        if earned == 0 {
            return;
        }

        let earned = u32::try_from(earned).unwrap_or(u32::MAX);
        self.tokens = self.tokens.saturating_add(earned).min(self.capacity);
        // Keep the partial period so slow trickles still earn tokens
        self.last_refill += self.refill_every * earned;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_drains() {
        let mut limiter = RateLimiter::with_limits(3, Duration::from_secs(60));
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_bucket_refills() {
        let mut limiter = RateLimiter::with_limits(2, Duration::from_millis(5));
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }
}
