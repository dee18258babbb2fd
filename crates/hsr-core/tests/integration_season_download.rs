//! Integration test: season download with mixed per-item outcomes and
//! resumable re-runs, against a scripted client and a tempdir database.

mod common;

use std::sync::Arc;

use hsr_core::config::{HsrConfig, RetryConfig};
use hsr_core::download::{ApiSource, Downloader};
use hsr_core::progress::{DownloadStatus, ItemKey, SourceKind};
use hsr_core::store::StatsDb;
use tempfile::tempdir;

use common::{Scripted, ScriptedClient};

const SEASON: i64 = 20232024;
const HEALTH: &str = "https://api-web.nhle.com/v1/ping";
const SCHEDULE: &str = "https://api-web.nhle.com/v1/schedule/20232024";

fn boxscore_url(game: i64) -> String {
    format!("https://api-web.nhle.com/v1/gamecenter/{}/boxscore", game)
}

fn fast_config() -> HsrConfig {
    let mut cfg = HsrConfig::default();
    // Generous budgets and tiny deterministic backoff so the test runs in
    // milliseconds of real time.
    cfg.budgets.api.requests_per_sec = 1000.0;
    cfg.budgets.api.burst = 1000.0;
    cfg.retry = Some(RetryConfig {
        max_attempts: 3,
        base_delay_secs: 0.001,
        max_delay_secs: 1,
        multiplier: 2.0,
        jitter: false,
    });
    cfg
}

fn scripted_client() -> ScriptedClient {
    let client = ScriptedClient::new();
    client.script(HEALTH, vec![Scripted::ok("{}")]);
    client.script(
        SCHEDULE,
        vec![Scripted::ok(
            r#"{"games": [{"id": 1, "home_team": "BOS", "away_team": "TOR"},
                           {"id": 2, "home_team": "NYR", "away_team": "MTL"},
                           {"id": 3, "home_team": "CHI", "away_team": "STL"}]}"#,
        )],
    );
    // Game 1 succeeds immediately.
    client.script(&boxscore_url(1), vec![Scripted::ok(r#"{"game": 1}"#)]);
    // Game 2 fails twice with a retryable status, then succeeds.
    client.script(
        &boxscore_url(2),
        vec![
            Scripted::status(500),
            Scripted::status(500),
            Scripted::ok(r#"{"game": 2}"#),
        ],
    );
    // Game 3 never recovers; retries exhaust.
    client.script(&boxscore_url(3), vec![Scripted::status(500)]);
    client
}

async fn drain(source: &ApiSource, force: bool) -> Vec<hsr_core::download::DownloadResult> {
    let mut rx = source.download_season(SEASON, force).await.unwrap();
    let mut results = Vec::new();
    while let Some(result) = rx.recv().await {
        results.push(result);
    }
    results
}

#[tokio::test]
async fn season_run_records_mixed_outcomes_and_resumes() {
    let state = tempdir().unwrap();
    let db = StatsDb::open_at(state.path().join("stats.db")).await.unwrap();
    let client = Arc::new(scripted_client());
    let source = ApiSource::new(client.clone(), db.clone(), &fast_config(), None);

    let results = drain(&source, false).await;
    // Schedule season item plus three games.
    assert_eq!(results.len(), 4);

    let by_game = |game: i64| {
        results
            .iter()
            .find(|r| r.game == Some(game))
            .unwrap_or_else(|| panic!("no result for game {}", game))
    };

    let a = by_game(1);
    assert!(a.is_successful());
    assert_eq!(a.retry_count, 0);

    let b = by_game(2);
    assert!(b.is_successful());
    assert_eq!(b.retry_count, 2, "two retries before the eventual success");

    let c = by_game(3);
    assert_eq!(c.status, DownloadStatus::Failed);
    let error = c.error.as_deref().expect("failed result carries an error");
    assert!(error.contains("HTTP 500"), "error was: {}", error);

    // Tracker state persisted through the repository.
    let rows = db.load_progress(SourceKind::Api, SEASON).await.unwrap();
    let status_of = |game: Option<i64>| {
        rows.iter()
            .find(|r| r.key.game == game)
            .unwrap_or_else(|| panic!("no row for {:?}", game))
            .status
    };
    assert_eq!(status_of(None), DownloadStatus::Completed);
    assert_eq!(status_of(Some(1)), DownloadStatus::Completed);
    assert_eq!(status_of(Some(2)), DownloadStatus::Completed);
    assert_eq!(status_of(Some(3)), DownloadStatus::Failed);
    let failed_row = rows.iter().find(|r| r.key.game == Some(3)).unwrap();
    assert_eq!(failed_row.retry_count, 3);
    assert!(failed_row.last_error.is_some());

    assert_eq!(client.hits(&boxscore_url(1)), 1);
    assert_eq!(client.hits(&boxscore_url(2)), 3);
    assert_eq!(client.hits(&boxscore_url(3)), 3);

    // Re-run without force: completed items are skipped, only the failure
    // is re-attempted (and fails again the same way).
    let rerun = drain(&source, false).await;
    let rerun_of = |game: i64| rerun.iter().find(|r| r.game == Some(game)).unwrap();
    assert_eq!(rerun_of(1).status, DownloadStatus::Skipped);
    assert_eq!(rerun_of(2).status, DownloadStatus::Skipped);
    assert_eq!(rerun_of(3).status, DownloadStatus::Failed);

    assert_eq!(client.hits(&boxscore_url(1)), 1, "completed item not re-fetched");
    assert_eq!(client.hits(&boxscore_url(2)), 3, "completed item not re-fetched");
    assert_eq!(client.hits(&boxscore_url(3)), 6, "failed item re-attempted");
    assert_eq!(client.hits(SCHEDULE), 1, "stored schedule reused");
}

#[tokio::test]
async fn force_rerun_refetches_completed_items() {
    let state = tempdir().unwrap();
    let db = StatsDb::open_at(state.path().join("stats.db")).await.unwrap();
    let client = Arc::new(scripted_client());
    let source = ApiSource::new(client.clone(), db.clone(), &fast_config(), None);

    drain(&source, false).await;
    assert_eq!(client.hits(&boxscore_url(1)), 1);

    let forced = drain(&source, true).await;
    assert!(forced.iter().all(|r| r.status != DownloadStatus::Skipped));
    assert_eq!(client.hits(&boxscore_url(1)), 2, "force bypasses skip");
    assert_eq!(client.hits(SCHEDULE), 2, "force re-fetches the schedule");
}

#[tokio::test]
async fn unhealthy_source_aborts_season_pass() {
    let state = tempdir().unwrap();
    let db = StatsDb::open_at(state.path().join("stats.db")).await.unwrap();
    let client = ScriptedClient::new();
    client.script(HEALTH, vec![Scripted::status(503)]);
    let source = ApiSource::new(Arc::new(client), db.clone(), &fast_config(), None);

    let err = source.download_season(SEASON, false).await.unwrap_err();
    assert!(err.to_string().contains("health check"));
    // Nothing was enumerated.
    let rows = db.load_progress(SourceKind::Api, SEASON).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn download_item_refetches_a_single_game() {
    let state = tempdir().unwrap();
    let db = StatsDb::open_at(state.path().join("stats.db")).await.unwrap();
    let client = Arc::new(scripted_client());
    let source = ApiSource::new(client.clone(), db.clone(), &fast_config(), None);

    drain(&source, false).await;

    let key = ItemKey::game_item(SourceKind::Api, SEASON, 1);
    let result = source.download_item(key).await.unwrap();
    assert!(result.is_successful());
    assert_eq!(client.hits(&boxscore_url(1)), 2, "explicit pull re-fetches");
}
