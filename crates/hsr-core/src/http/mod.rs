//! HTTP client boundary.
//!
//! The core never talks to the network directly; source engines go through
//! the `HttpClient` trait. The one concrete implementation (`CurlClient`)
//! runs libcurl in `spawn_blocking`, so async workers suspend on the join
//! handle while the transfer runs. Response body parsing belongs to the
//! source adapters, not this layer.

mod curl_client;
mod parse;

pub use curl_client::CurlClient;
pub use parse::{header_map, parse_retry_after};

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::retry::FetchError;

/// One outbound request: URL, extra headers, and a total-transfer timeout.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout,
        }
    }
}

/// Raw response: status, body bytes, response headers (names lowercased).
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u32,
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl FetchResponse {
    /// Convert a non-2xx response into a classified fetch error, surfacing a
    /// Retry-After hint when the server sent one. 2xx responses pass through.
    pub fn into_success(self) -> Result<FetchResponse, FetchError> {
        if (200..300).contains(&self.status) {
            return Ok(self);
        }
        let retry_after = self
            .headers
            .get("retry-after")
            .and_then(|v| parse_retry_after(v));
        Err(FetchError::Http {
            status: self.status,
            retry_after,
        })
    }
}

/// Transport collaborator consumed by the source engines.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform the request, returning the response for any HTTP status, or a
    /// transport-level error (timeout, connection failure).
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u32, headers: &[(&str, &str)]) -> FetchResponse {
        FetchResponse {
            status,
            body: Vec::new(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn success_passes_through() {
        assert!(response(200, &[]).into_success().is_ok());
        assert!(response(204, &[]).into_success().is_ok());
    }

    #[test]
    fn error_status_becomes_fetch_error_with_hint() {
        let err = response(429, &[("retry-after", "7")])
            .into_success()
            .unwrap_err();
        match err {
            FetchError::Http {
                status,
                retry_after,
            } => {
                assert_eq!(status, 429);
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }
}
