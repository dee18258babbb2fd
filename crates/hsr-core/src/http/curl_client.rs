//! libcurl-backed HttpClient.
//!
//! Runs each transfer on the blocking pool. Follows redirects, applies a
//! connect timeout plus the caller's total timeout, and collects both the
//! response body and header lines.

use std::str;
use std::time::Duration;

use async_trait::async_trait;

use crate::retry::FetchError;

use super::parse::header_map;
use super::{FetchRequest, FetchResponse, HttpClient};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("hsr/", env!("CARGO_PKG_VERSION"));

/// Default transport for all source adapters.
#[derive(Debug, Default, Clone)]
pub struct CurlClient;

impl CurlClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HttpClient for CurlClient {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, FetchError> {
        tokio::task::spawn_blocking(move || fetch_blocking(&req))
            .await
            .map_err(|e| FetchError::Internal(format!("fetch task join: {}", e)))?
    }
}

/// Performs a GET and returns status, body, and parsed headers.
/// Runs in the current thread; call from `spawn_blocking` in async code.
fn fetch_blocking(req: &FetchRequest) -> Result<FetchResponse, FetchError> {
    let mut body: Vec<u8> = Vec::new();
    let mut header_lines: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(&req.url)?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(CONNECT_TIMEOUT)?;
    easy.timeout(req.timeout)?;
    easy.useragent(USER_AGENT)?;
    easy.accept_encoding("")?; // let libcurl negotiate and decode

    let mut list = curl::easy::List::new();
    for (k, v) in &req.headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    if !req.headers.is_empty() {
        easy.http_headers(list)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                header_lines.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let status = easy.response_code()?;

    Ok(FetchResponse {
        status,
        body,
        headers: header_map(&header_lines),
    })
}
