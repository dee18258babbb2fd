//! Token bucket state: capped float pool, lazy refill.

use std::time::Duration;

use tokio::time::Instant;

/// Fixed-capacity token pool replenished at `refill_rate` tokens/second.
///
/// Refill happens lazily when the bucket is consulted; tokens never exceed
/// capacity and never go negative. Not thread-safe by itself; the limiter
/// wraps it in a mutex.
#[derive(Debug)]
pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket. `capacity` and `refill_rate` are clamped to be
    /// strictly positive so a misconfigured source cannot stall forever.
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        let capacity = if capacity > 0.0 { capacity } else { 1.0 };
        let refill_rate = if refill_rate > 0.0 { refill_rate } else { 1.0 };
        Self {
            tokens: capacity,
            capacity,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn tokens(&self) -> f64 {
        self.tokens.min(self.capacity)
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Debit `n` tokens if available after refill. Returns true on success.
    pub fn try_take(&mut self, n: f64) -> bool {
        self.refill();
        if self.tokens >= n {
            self.tokens -= n;
            true
        } else {
            false
        }
    }

    /// Time until `n` tokens will have accumulated, assuming no other debits.
    /// Zero if they are already available. Call after a failed `try_take`.
    pub fn shortfall(&self, n: f64) -> Duration {
        let missing = n - self.tokens;
        if missing <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(missing / self.refill_rate)
    }

    #[cfg(test)]
    pub(crate) fn backdate_last_refill(&mut self, by: Duration) {
        self.last_refill -= by;
    }
}
