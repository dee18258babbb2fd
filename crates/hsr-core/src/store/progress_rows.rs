//! Progress row persistence: the `ProgressStore` implementation.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::Row;

use crate::progress::{
    DownloadStatus, ItemKey, ProgressEntry, ProgressStore, SeasonId, SourceKind,
};

use super::db::{game_from_db, game_to_db, StatsDb};

impl StatsDb {
    /// All progress rows for one (source, season).
    pub async fn load_progress(
        &self,
        source: SourceKind,
        season: SeasonId,
    ) -> Result<Vec<ProgressEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT source, season, game_id, status, started_at, completed_at,
                   retry_count, last_error
            FROM progress
            WHERE source = ?1 AND season = ?2
            ORDER BY game_id ASC
            "#,
        )
        .bind(source.as_str())
        .bind(season)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let source_str: String = row.get("source");
            let Some(source) = SourceKind::parse(&source_str) else {
                tracing::warn!(source = %source_str, "skipping progress row with unknown source");
                continue;
            };
            let season: i64 = row.get("season");
            let game_id: i64 = row.get("game_id");
            let status_str: String = row.get("status");
            let started_at: Option<i64> = row.get("started_at");
            let completed_at: Option<i64> = row.get("completed_at");
            let retry_count: i64 = row.get("retry_count");
            let last_error: Option<String> = row.get("last_error");

            out.push(ProgressEntry {
                key: ItemKey {
                    source,
                    season,
                    game: game_from_db(game_id),
                },
                status: DownloadStatus::from_str(&status_str),
                started_at,
                completed_at,
                retry_count: retry_count.max(0) as u32,
                last_error,
            });
        }
        Ok(out)
    }

    /// Insert or update one progress row by its natural key.
    pub async fn upsert_progress(&self, entry: &ProgressEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO progress (
                source, season, game_id, status, started_at, completed_at,
                retry_count, last_error
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (source, season, game_id) DO UPDATE SET
                status = excluded.status,
                started_at = excluded.started_at,
                completed_at = excluded.completed_at,
                retry_count = excluded.retry_count,
                last_error = excluded.last_error
            "#,
        )
        .bind(entry.key.source.as_str())
        .bind(entry.key.season)
        .bind(game_to_db(entry.key.game))
        .bind(entry.status.as_str())
        .bind(entry.started_at)
        .bind(entry.completed_at)
        .bind(entry.retry_count as i64)
        .bind(&entry.last_error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Normalize rows left `downloading` by a dead run back to `pending`.
    /// Returns the number of rows reset.
    pub async fn reset_stale_progress(
        &self,
        source: SourceKind,
        season: SeasonId,
    ) -> Result<u64> {
        let r = sqlx::query(
            r#"
            UPDATE progress
            SET status = 'pending'
            WHERE source = ?1 AND season = ?2 AND status = 'downloading'
            "#,
        )
        .bind(source.as_str())
        .bind(season)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }
}

#[async_trait]
impl ProgressStore for StatsDb {
    async fn load(&self, source: SourceKind, season: SeasonId) -> Result<Vec<ProgressEntry>> {
        self.load_progress(source, season).await
    }

    async fn upsert(&self, entry: &ProgressEntry) -> Result<()> {
        self.upsert_progress(entry).await
    }

    async fn reset_stale_downloading(
        &self,
        source: SourceKind,
        season: SeasonId,
    ) -> Result<u64> {
        self.reset_stale_progress(source, season).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::db::open_memory;
    use super::*;

    fn entry(game: Option<i64>, status: DownloadStatus) -> ProgressEntry {
        ProgressEntry {
            key: ItemKey {
                source: SourceKind::Api,
                season: 20232024,
                game,
            },
            status,
            started_at: Some(1_700_000_000),
            completed_at: None,
            retry_count: 2,
            last_error: Some("HTTP 503".into()),
        }
    }

    #[tokio::test]
    async fn upsert_round_trips_and_never_duplicates() {
        let db = open_memory().await.unwrap();
        let e = entry(Some(2023020001), DownloadStatus::Failed);
        db.upsert_progress(&e).await.unwrap();
        db.upsert_progress(&ProgressEntry {
            status: DownloadStatus::Completed,
            ..e.clone()
        })
        .await
        .unwrap();

        let rows = db.load_progress(SourceKind::Api, 20232024).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, DownloadStatus::Completed);
        assert_eq!(rows[0].key, e.key);
        assert_eq!(rows[0].retry_count, 2);
    }

    #[tokio::test]
    async fn season_item_stored_distinct_from_games() {
        let db = open_memory().await.unwrap();
        db.upsert_progress(&entry(None, DownloadStatus::Completed))
            .await
            .unwrap();
        db.upsert_progress(&entry(Some(1), DownloadStatus::Pending))
            .await
            .unwrap();

        let rows = db.load_progress(SourceKind::Api, 20232024).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.key.game.is_none()));
        assert!(rows.iter().any(|r| r.key.game == Some(1)));
    }

    #[tokio::test]
    async fn stale_downloading_rows_are_reset() {
        let db = open_memory().await.unwrap();
        db.upsert_progress(&entry(Some(1), DownloadStatus::Downloading))
            .await
            .unwrap();
        db.upsert_progress(&entry(Some(2), DownloadStatus::Completed))
            .await
            .unwrap();

        let reset = db
            .reset_stale_progress(SourceKind::Api, 20232024)
            .await
            .unwrap();
        assert_eq!(reset, 1);

        let rows = db.load_progress(SourceKind::Api, 20232024).await.unwrap();
        let by_game = |g: i64| rows.iter().find(|r| r.key.game == Some(g)).unwrap();
        assert_eq!(by_game(1).status, DownloadStatus::Pending);
        assert_eq!(by_game(2).status, DownloadStatus::Completed);
    }
}
