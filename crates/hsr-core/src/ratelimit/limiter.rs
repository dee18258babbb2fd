//! Async acquisition over a token bucket.

use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::SourceBudget;

use super::TokenBucket;

/// Smallest sleep between acquisition re-checks, so a contended limiter does
/// not busy-spin when the computed shortfall rounds to zero.
const MIN_WAIT: Duration = Duration::from_millis(5);

/// Error returned when an acquisition can never succeed.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RateLimitError {
    /// The request asks for more tokens than the bucket can ever hold.
    /// Rejected by policy instead of suspending forever.
    #[error("requested {requested} tokens exceeds bucket capacity {capacity}")]
    ExceedsCapacity { requested: f64, capacity: f64 },
}

/// Suspend-until-permitted gate for outbound requests to one source.
///
/// All debiting goes through a single mutex; the sleep waiting for refill
/// happens outside the lock, and availability is re-checked after waking so
/// concurrent acquirers cannot over-issue.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    capacity: f64,
}

impl RateLimiter {
    pub fn new(budget: SourceBudget) -> Self {
        let bucket = TokenBucket::new(budget.burst, budget.requests_per_sec);
        let capacity = bucket.capacity();
        Self {
            bucket: Mutex::new(bucket),
            capacity,
        }
    }

    /// Acquire one token, suspending until it is available.
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        self.acquire_n(1.0).await
    }

    /// Acquire `n` tokens, suspending until they have accumulated.
    pub async fn acquire_n(&self, n: f64) -> Result<(), RateLimitError> {
        if n > self.capacity {
            return Err(RateLimitError::ExceedsCapacity {
                requested: n,
                capacity: self.capacity,
            });
        }
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                if bucket.try_take(n) {
                    return Ok(());
                }
                bucket.shortfall(n)
            };
            tokio::time::sleep(wait.max(MIN_WAIT)).await;
        }
    }

    /// Non-suspending variant: take one token now or report failure.
    pub async fn try_acquire(&self) -> bool {
        self.bucket.lock().await.try_take(1.0)
    }

    /// Current token count (after any pending lazy refill is accounted).
    pub async fn available(&self) -> f64 {
        self.bucket.lock().await.tokens()
    }
}
