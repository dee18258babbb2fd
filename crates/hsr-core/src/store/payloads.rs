//! Feed payload storage and raw response archival.

use anyhow::Result;
use sha2::{Digest, Sha256};
use sqlx::Row;

use crate::progress::{unix_timestamp, Feed, GameId, SeasonId};

use super::db::{game_from_db, game_to_db, StatsDb};

/// SHA-256 of the content, lowercase hex. Used to key archived raw blobs so
/// identical responses are stored once.
pub fn digest_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

impl StatsDb {
    /// Store the parsed payload for one feed item, archiving the raw bytes
    /// when provided. Returns the raw digest, if any. Idempotent upsert.
    pub async fn save_payload(
        &self,
        feed: Feed,
        season: SeasonId,
        game: Option<GameId>,
        payload: &serde_json::Value,
        raw: Option<&[u8]>,
    ) -> Result<Option<String>> {
        let digest = match raw {
            Some(bytes) => {
                let digest = digest_hex(bytes);
                sqlx::query(
                    r#"
                    INSERT INTO raw_blobs (digest, content, created_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT (digest) DO NOTHING
                    "#,
                )
                .bind(&digest)
                .bind(bytes)
                .bind(unix_timestamp())
                .execute(&self.pool)
                .await?;
                Some(digest)
            }
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO payloads (feed, season, game_id, payload_json, raw_digest, fetched_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (feed, season, game_id) DO UPDATE SET
                payload_json = excluded.payload_json,
                raw_digest = excluded.raw_digest,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(feed.as_str())
        .bind(season)
        .bind(game_to_db(game))
        .bind(serde_json::to_string(payload)?)
        .bind(&digest)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;

        Ok(digest)
    }

    /// Load the parsed payload for one feed item, if present.
    pub async fn load_payload(
        &self,
        feed: Feed,
        season: SeasonId,
        game: Option<GameId>,
    ) -> Result<Option<serde_json::Value>> {
        let row = sqlx::query(
            r#"
            SELECT payload_json FROM payloads
            WHERE feed = ?1 AND season = ?2 AND game_id = ?3
            "#,
        )
        .bind(feed.as_str())
        .bind(season)
        .bind(game_to_db(game))
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let json: String = row.get("payload_json");
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Game ids with a stored payload for one feed and season.
    pub async fn list_feed_games(&self, feed: Feed, season: SeasonId) -> Result<Vec<GameId>> {
        let rows = sqlx::query(
            r#"
            SELECT game_id FROM payloads
            WHERE feed = ?1 AND season = ?2 AND game_id != 0
            ORDER BY game_id ASC
            "#,
        )
        .bind(feed.as_str())
        .bind(season)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| game_from_db(row.get("game_id")))
            .collect())
    }

    /// Archived raw bytes by content digest.
    pub async fn load_raw(&self, digest: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query(r#"SELECT content FROM raw_blobs WHERE digest = ?1"#)
            .bind(digest)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("content")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::db::open_memory;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn payload_round_trip_with_raw_archive() {
        let db = open_memory().await.unwrap();
        let payload = json!({"teams": [{"abbrev": "BOS", "wins": 40}]});
        let raw = b"<html>standings</html>";

        let digest = db
            .save_payload(Feed::Standings, 20232024, None, &payload, Some(raw))
            .await
            .unwrap()
            .expect("digest for archived raw");
        assert_eq!(digest, digest_hex(raw));

        let loaded = db
            .load_payload(Feed::Standings, 20232024, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, payload);

        let blob = db.load_raw(&digest).await.unwrap().unwrap();
        assert_eq!(blob, raw);
    }

    #[tokio::test]
    async fn payload_upsert_replaces_previous() {
        let db = open_memory().await.unwrap();
        let game = Some(2023020001);
        db.save_payload(Feed::Boxscore, 20232024, game, &json!({"v": 1}), None)
            .await
            .unwrap();
        db.save_payload(Feed::Boxscore, 20232024, game, &json!({"v": 2}), None)
            .await
            .unwrap();

        let loaded = db
            .load_payload(Feed::Boxscore, 20232024, game)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, json!({"v": 2}));

        let games = db.list_feed_games(Feed::Boxscore, 20232024).await.unwrap();
        assert_eq!(games, vec![2023020001]);
    }

    #[tokio::test]
    async fn missing_payload_is_none() {
        let db = open_memory().await.unwrap();
        let loaded = db
            .load_payload(Feed::Shifts, 20232024, Some(99))
            .await
            .unwrap();
        assert!(loaded.is_none());
    }
}
