//! Per-source request throttling.
//!
//! Each source adapter owns one token bucket tuned to that source's request
//! budget. Buckets refill lazily at acquisition time; there is no background
//! timer. The async limiter serializes debiting behind a mutex so concurrent
//! acquirers can never over-issue tokens.

mod bucket;
mod limiter;

pub use bucket::TokenBucket;
pub use limiter::{RateLimitError, RateLimiter};
