//! Classify HTTP status and curl errors into retry policy error kinds.

use std::time::Duration;

use super::error::FetchError;
use super::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
///
/// 429 and 503 are throttling (with an optional Retry-After hint); other 5xx
/// are retryable server failures; anything else (404 for a nonexistent game,
/// auth failures, ...) is fatal.
pub fn classify_http_status(status: u32, retry_after: Option<Duration>) -> ErrorKind {
    match status {
        429 | 503 => ErrorKind::Throttled { retry_after },
        500..=599 => ErrorKind::Http5xx(status as u16),
        _ => ErrorKind::Fatal,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Fatal
}

/// Classify a fetch error (curl, HTTP, or parse) into an ErrorKind.
pub fn classify(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::Curl(ce) => classify_curl_error(ce),
        FetchError::Http {
            status,
            retry_after,
        } => classify_http_status(*status, *retry_after),
        FetchError::Parse(_) | FetchError::Internal(_) => ErrorKind::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_429_and_503_throttled() {
        assert_eq!(
            classify_http_status(429, None),
            ErrorKind::Throttled { retry_after: None }
        );
        let hint = Some(Duration::from_secs(7));
        assert_eq!(
            classify_http_status(503, hint),
            ErrorKind::Throttled { retry_after: hint }
        );
    }

    #[test]
    fn http_5xx_retryable() {
        assert!(matches!(
            classify_http_status(500, None),
            ErrorKind::Http5xx(500)
        ));
        assert!(matches!(
            classify_http_status(502, None),
            ErrorKind::Http5xx(502)
        ));
    }

    #[test]
    fn http_4xx_fatal() {
        assert_eq!(classify_http_status(404, None), ErrorKind::Fatal);
        assert_eq!(classify_http_status(403, None), ErrorKind::Fatal);
        assert_eq!(classify_http_status(401, None), ErrorKind::Fatal);
    }

    #[test]
    fn parse_errors_fatal() {
        let e = FetchError::Parse("unexpected end of input".into());
        assert_eq!(classify(&e), ErrorKind::Fatal);
    }
}
