//! Request rate limiting behind a minimal `allow(key)` interface.
//!
//! The admission chain only sees [`RateLimiter`]. The default
//! implementation is a keyed GCRA limiter from `governor`, which is
//! lock-free and safe to hit concurrently for the same key.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultKeyedRateLimiter, Quota};

use crate::config::RateLimitConfig;

pub trait RateLimiter: Send + Sync {
    /// Consume one unit for `key`. Returns false if the key is over quota.
    fn allow(&self, key: &str) -> bool;
}

/// Keyed token-bucket limiter: `per_minute` sustained, `burst` at once.
pub struct GovernorRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
}

impl GovernorRateLimiter {
    pub fn new(per_minute: u32, burst: u32) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(per_minute);
        Self {
            limiter: governor::RateLimiter::keyed(Quota::per_minute(per_minute).allow_burst(burst)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_minute, config.burst)
    }

    /// Drop state for keys that have fully replenished.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }
}

impl RateLimiter for GovernorRateLimiter {
    fn allow(&self, key: &str) -> bool {
        self.limiter.check_key(&key.to_string()).is_ok()
    }
}

/// Spawn a background task that periodically trims idle limiter keys.
pub fn spawn_limiter_cleanup(limiter: Arc<GovernorRateLimiter>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            limiter.retain_recent();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_reject() {
        let limiter = GovernorRateLimiter::new(1, 3);
        assert!(limiter.allow("user:1"));
        assert!(limiter.allow("user:1"));
        assert!(limiter.allow("user:1"));
        assert!(!limiter.allow("user:1"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = GovernorRateLimiter::new(1, 1);
        assert!(limiter.allow("user:1"));
        assert!(!limiter.allow("user:1"));
        assert!(limiter.allow("user:2"));
    }

    #[test]
    fn test_concurrent_callers_share_one_quota() {
        let limiter = Arc::new(GovernorRateLimiter::new(1, 50));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..20).filter(|_| limiter.allow("ip:127.0.0.1")).count())
            })
            .collect();
        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 50);
    }
}
