//! Request pacing
//!
//! A token-bucket limiter (the `governor` crate) gates every scrape
//! request. Logged-in pages get a deliberately slow preset; tests turn
//! pacing off through the client config instead.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as TokenBucket};

/// Pacing settings
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Steady-state requests per second
    pub requests_per_second: u32,
    /// Requests that may go ahead of the steady rate
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
            burst_size: 5,
        }
    }
}

impl RateLimiterConfig {
    /// Explicit rate and burst
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }

    /// Pace for scraping logged-in pages: slow, small burst
    pub fn scraping() -> Self {
        Self {
            requests_per_second: 2,
            burst_size: 4,
        }
    }
}

/// Gate held in front of the HTTP client
pub struct RateLimiter {
    bucket: TokenBucket<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>,
}

impl RateLimiter {
    /// Build a limiter from `config`; zero values are clamped to one
    pub fn new(config: &RateLimiterConfig) -> Self {
        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);
        Self {
            bucket: TokenBucket::direct(Quota::per_second(rate).allow_burst(burst)),
        }
    }

    /// Wait until the next request may go out
    pub async fn wait(&self) {
        self.bucket.until_ready().await;
    }

    /// Whether a request may go out right now, taking the slot if so
    pub fn check(&self) -> bool {
        self.bucket.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}
