//! Process-wide request pacing
//!
//! Every outbound request waits on the same [`RateLimiter`] first. The limiter
//! keeps the start time of the previous request and sleeps the caller until
//! the configured delay has passed since then.
//!
//! The read-compare-sleep-update sequence runs under one async mutex. A second
//! caller therefore queues behind the first and measures its delay from the
//! timestamp the first one wrote, so concurrent workers can never fire
//! together on a stale timestamp.

use crate::config::RateLimit;
use rand::Rng;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum, optionally randomized, spacing between requests
#[derive(Debug)]
pub struct RateLimiter {
    limit: RateLimit,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            last_request: Mutex::new(None),
        }
    }

    /// A limiter that never sleeps
    pub fn unlimited() -> Self {
        Self::new(RateLimit::Fixed(0.0))
    }

    /// Delay for the next request; ranges are re-sampled on every call
    fn target_delay(&self) -> Duration {
        let seconds = match self.limit {
            RateLimit::Fixed(seconds) => seconds,
            RateLimit::Range { min, max } if max > min => rand::thread_rng().gen_range(min..=max),
            RateLimit::Range { min, .. } => min,
        };
        // Unvalidated limits saturate instead of panicking
        Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Blocks the caller until it may issue its request
    ///
    /// Call this immediately before each outbound request.
    pub async fn wait(&self) {
        let mut last_request = self.last_request.lock().await;
        let delay = self.target_delay();

        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < delay {
                let remaining = delay - elapsed;
                tracing::trace!("Rate limit: sleeping {:?}", remaining);
                tokio::time::sleep(remaining).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}
