//! Immutable outcome of one download attempt.

use crate::progress::{unix_timestamp, DownloadStatus, GameId, ItemKey, SeasonId, SourceKind};

/// Message recorded when a failure reaches the result without a cause.
const DEFAULT_ERROR: &str = "download failed";

/// Value object describing one fetched (or skipped, or failed) item.
/// Produced by the engine and passed by value to consumers; never mutated.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub source: SourceKind,
    pub season: SeasonId,
    pub game: Option<GameId>,
    /// Structured payload; `Null` for skipped and failed items.
    pub payload: serde_json::Value,
    pub fetched_at: i64,
    pub status: DownloadStatus,
    /// Digest of the archived raw response, for sources that archive.
    pub raw_digest: Option<String>,
    pub error: Option<String>,
    /// Retries consumed: attempts - 1 for successes, attempts for failures.
    pub retry_count: u32,
}

impl DownloadResult {
    pub fn completed(
        key: ItemKey,
        payload: serde_json::Value,
        raw_digest: Option<String>,
        attempts: u32,
    ) -> Self {
        Self {
            source: key.source,
            season: key.season,
            game: key.game,
            payload,
            fetched_at: unix_timestamp(),
            status: DownloadStatus::Completed,
            raw_digest,
            error: None,
            retry_count: attempts.saturating_sub(1),
        }
    }

    /// Failed result. The error message is auto-populated with a default
    /// when the caller has nothing better, so a Failed status always carries
    /// a non-empty message.
    pub fn failed(key: ItemKey, error: Option<String>, attempts: u32) -> Self {
        let error = match error {
            Some(msg) if !msg.is_empty() => msg,
            _ => DEFAULT_ERROR.to_string(),
        };
        Self {
            source: key.source,
            season: key.season,
            game: key.game,
            payload: serde_json::Value::Null,
            fetched_at: unix_timestamp(),
            status: DownloadStatus::Failed,
            raw_digest: None,
            error: Some(error),
            retry_count: attempts,
        }
    }

    /// Item already satisfied by a prior run.
    pub fn skipped(key: ItemKey) -> Self {
        Self {
            source: key.source,
            season: key.season,
            game: key.game,
            payload: serde_json::Value::Null,
            fetched_at: unix_timestamp(),
            status: DownloadStatus::Skipped,
            raw_digest: None,
            error: None,
            retry_count: 0,
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey {
            source: self.source,
            season: self.season,
            game: self.game,
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == DownloadStatus::Completed
    }

    pub fn is_item_level(&self) -> bool {
        self.game.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> ItemKey {
        ItemKey::game_item(SourceKind::Api, 20232024, 2023020001)
    }

    #[test]
    fn completed_result_counts_retries() {
        let r = DownloadResult::completed(key(), json!({"goals": 3}), None, 3);
        assert!(r.is_successful());
        assert!(r.is_item_level());
        assert_eq!(r.retry_count, 2);
        assert!(r.error.is_none());
    }

    #[test]
    fn failed_result_always_has_an_error_message() {
        let r = DownloadResult::failed(key(), None, 1);
        assert_eq!(r.status, DownloadStatus::Failed);
        assert_eq!(r.error.as_deref(), Some(DEFAULT_ERROR));

        let r = DownloadResult::failed(key(), Some(String::new()), 2);
        assert_eq!(r.error.as_deref(), Some(DEFAULT_ERROR));

        let r = DownloadResult::failed(key(), Some("HTTP 500".into()), 5);
        assert_eq!(r.error.as_deref(), Some("HTTP 500"));
        assert_eq!(r.retry_count, 5);
    }

    #[test]
    fn skipped_result_is_not_successful() {
        let season_key = ItemKey::season_item(SourceKind::Standings, 20232024);
        let r = DownloadResult::skipped(season_key);
        assert_eq!(r.status, DownloadStatus::Skipped);
        assert!(!r.is_successful());
        assert!(!r.is_item_level());
        assert_eq!(r.key(), season_key);
    }
}
