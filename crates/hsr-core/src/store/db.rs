//! SQLite-backed database handle: connection, migrations.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite-backed stats database.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/hsr/stats.db`.
#[derive(Clone)]
pub struct StatsDb {
    pub(crate) pool: Pool<Sqlite>,
}

impl StatsDb {
    /// Open (or create) the default database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("hsr")?;
        let state_dir = xdg_dirs.get_state_home().join("hsr");
        let db_path = state_dir.join("stats.db");

        // Ensure parent directory exists.
        tokio::fs::create_dir_all(&state_dir).await?;

        let uri = path_to_sqlite_uri(&db_path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;

        let db = StatsDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    /// Intended for tests so the DB can be placed in a temp directory.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let db = StatsDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        // Three tables: per-item progress, parsed feed payloads, and raw
        // response archive. `game_id = 0` marks season-level rows so the
        // natural key stays a plain composite primary key (SQLite treats
        // NULLs in unique constraints as distinct).
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS progress (
                source TEXT NOT NULL,
                season INTEGER NOT NULL,
                game_id INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                started_at INTEGER,
                completed_at INTEGER,
                retry_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                PRIMARY KEY (source, season, game_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS payloads (
                feed TEXT NOT NULL,
                season INTEGER NOT NULL,
                game_id INTEGER NOT NULL DEFAULT 0,
                payload_json TEXT NOT NULL,
                raw_digest TEXT,
                fetched_at INTEGER NOT NULL,
                PRIMARY KEY (feed, season, game_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS raw_blobs (
                digest TEXT PRIMARY KEY,
                content BLOB NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Map an optional game id to its stored form (0 = season-level row).
pub(super) fn game_to_db(game: Option<i64>) -> i64 {
    game.unwrap_or(0)
}

pub(super) fn game_from_db(game: i64) -> Option<i64> {
    if game == 0 {
        None
    } else {
        Some(game)
    }
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<StatsDb> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = StatsDb { pool };
    db.migrate().await?;
    Ok(db)
}
