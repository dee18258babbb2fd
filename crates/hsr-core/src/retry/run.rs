//! Retry loop: run an async unit of work until success or policy says stop.

use std::future::Future;
use std::time::{Duration, Instant};

use super::classify;
use super::error::FetchError;
use super::policy::{ErrorKind, RetryDecision, RetryPolicy};

/// Successful outcome of a retry-wrapped call: the value plus how much work
/// it took. `attempts` feeds the retry_count on download results.
#[derive(Debug)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Failure outcome of a retry-wrapped call.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// All attempts were consumed by retryable errors.
    #[error("max retries exceeded after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: FetchError },
    /// A non-retryable error occurred; no further budget was consumed.
    #[error("fatal error on attempt {attempts}: {error}")]
    Fatal { attempts: u32, error: FetchError },
}

impl RetryError {
    /// The underlying fetch error, whichever arm carried it.
    pub fn cause(&self) -> &FetchError {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal { error, .. } => error,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Fatal { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Runs `work` until it succeeds or the retry policy says to stop.
///
/// On retryable failure, sleeps for the backoff duration (plus uniform jitter
/// in [0, delay) when the policy enables it) then tries again. The work
/// closure is the only side effect re-invoked; idempotency of the wrapped
/// operation is the caller's contract.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut work: F,
) -> Result<Retried<T>, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let start = Instant::now();
    let mut attempt = 1u32;
    loop {
        match work().await {
            Ok(value) => {
                return Ok(Retried {
                    value,
                    attempts: attempt,
                    elapsed: start.elapsed(),
                })
            }
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => {
                        return Err(if kind == ErrorKind::Fatal {
                            RetryError::Fatal {
                                attempts: attempt,
                                error: e,
                            }
                        } else {
                            RetryError::Exhausted {
                                attempts: attempt,
                                last: e,
                            }
                        });
                    }
                    RetryDecision::RetryAfter(delay) => {
                        tokio::time::sleep(jittered(policy, delay)).await;
                        attempt += 1;
                    }
                }
            }
        }
    }
}

fn jittered(policy: &RetryPolicy, delay: Duration) -> Duration {
    if !policy.jitter || delay.is_zero() {
        return delay;
    }
    let extra = delay.as_secs_f64() * rand::random::<f64>();
    delay + Duration::from_secs_f64(extra)
}
