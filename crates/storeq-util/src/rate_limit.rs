//! Rate limiting utilities

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::UserId;

/// Simple token-bucket rate limiter, one bucket per chat user
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum tokens (messages) per bucket
    max_tokens: u32,
    /// How often tokens are replenished
    refill_interval: Duration,
    users: HashMap<UserId, UserBucket>,
}

#[derive(Debug)]
struct UserBucket {
    tokens: u32,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `max_requests` - Maximum messages allowed per interval
    /// * `interval` - Time interval for the limit
    pub fn new(max_requests: u32, interval: Duration) -> Self {
        Self {
            max_tokens: max_requests,
            refill_interval: interval,
            users: HashMap::new(),
        }
    }

    /// Returns `true` if the message is allowed, `false` if rate limited
    pub fn check(&mut self, user_id: &UserId) -> bool {
        let now = Instant::now();

        let bucket = self.users.entry(user_id.clone()).or_insert(UserBucket {
            tokens: self.max_tokens,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill);
        if elapsed >= self.refill_interval {
            let intervals = (elapsed.as_millis() / self.refill_interval.as_millis()) as u32;
            bucket.tokens = bucket
                .tokens
                .saturating_add(intervals.saturating_mul(self.max_tokens))
                .min(self.max_tokens);
            bucket.last_refill = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Clean up stale user entries
    pub fn cleanup(&mut self, stale_after: Duration) {
        let now = Instant::now();
        self.users
            .retain(|_, bucket| now.duration_since(bucket.last_refill) < stale_after);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_allows_within_limit() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(1));
        let user = UserId::new("1001");

        for _ in 0..5 {
            assert!(limiter.check(&user));
        }

        assert!(!limiter.check(&user));
    }

    #[test]
    fn test_rate_limiter_different_users() {
        let mut limiter = RateLimiter::new(2, Duration::from_secs(1));
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        assert!(limiter.check(&alice));
        assert!(limiter.check(&alice));
        assert!(!limiter.check(&alice));

        assert!(limiter.check(&bob));
        assert!(limiter.check(&bob));
    }

    #[test]
    fn test_cleanup_drops_stale_buckets() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(60));
        let user = UserId::new("1001");

        assert!(limiter.check(&user));
        assert!(!limiter.check(&user));

        limiter.cleanup(Duration::ZERO);
        assert!(limiter.check(&user));
    }
}
