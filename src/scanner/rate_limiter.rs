//! Request rate limiting shared by all probe workers.
//!
//! Token bucket over `governor`; every worker waits for a token before it
//! issues a request, so the cap holds for the whole scan rather than per
//! worker.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// A cloneable handle onto one shared token bucket.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<GovLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    rate: NonZeroU32,
}

impl RateLimiter {
    /// Allow at most `rate` requests per second.
    pub fn new(rate: NonZeroU32) -> Self {
        Self {
            limiter: Arc::new(GovLimiter::direct(Quota::per_second(rate))),
            rate,
        }
    }

    /// Build a limiter from an optional setting; zero means unlimited.
    pub fn from_setting(rate: u32) -> Option<Self> {
        NonZeroU32::new(rate).map(Self::new)
    }

    /// Wait until the bucket allows another request.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Time between two requests at the configured rate.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.rate.get()))
    }
}
