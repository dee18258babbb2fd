//! Fetch error type for retry classification.

use std::fmt;
use std::time::Duration;

/// Error returned by a single item fetch (curl failure, HTTP error, or a
/// response body the source parser rejects). Used so we can classify and
/// decide retries before converting to anyhow.
#[derive(Debug)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status. 429/503 responses may carry a
    /// Retry-After hint.
    Http {
        status: u32,
        retry_after: Option<Duration>,
    },
    /// Response body could not be parsed into the source's record shape.
    /// Indicates a permanent problem with the item; never retried.
    Parse(String),
    /// Worker-side failure outside the transfer itself (e.g. blocking task
    /// join). Never retried.
    Internal(String),
}

impl From<curl::Error> for FetchError {
    fn from(e: curl::Error) -> Self {
        FetchError::Curl(e)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Curl(e) => write!(f, "{}", e),
            FetchError::Http { status, .. } => write!(f, "HTTP {}", status),
            FetchError::Parse(msg) => write!(f, "parse: {}", msg),
            FetchError::Internal(msg) => write!(f, "internal: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Curl(e) => Some(e),
            FetchError::Http { .. } | FetchError::Parse(_) | FetchError::Internal(_) => None,
        }
    }
}
