//! Integration test: full orchestrated pass over all four sources with
//! validation feedback requeueing a disagreeing feed.

mod common;

use std::sync::Arc;

use hsr_core::config::{HsrConfig, RetryConfig, SourceBudget};
use hsr_core::http::HttpClient;
use hsr_core::orchestrate;
use hsr_core::progress::{DownloadStatus, SourceKind};
use hsr_core::store::StatsDb;
use tempfile::tempdir;

use common::{Scripted, ScriptedClient};

const SEASON: i64 = 20232024;
const GAME: i64 = 2023020001;

fn fast_config() -> HsrConfig {
    let mut cfg = HsrConfig::default();
    let fast = SourceBudget::new(1000.0, 1000.0);
    cfg.budgets.api = fast;
    cfg.budgets.events = fast;
    cfg.budgets.shifts = fast;
    cfg.budgets.standings = fast;
    cfg.retry = Some(RetryConfig {
        max_attempts: 2,
        base_delay_secs: 0.001,
        max_delay_secs: 1,
        multiplier: 2.0,
        jitter: false,
    });
    cfg
}

fn scripted_client() -> ScriptedClient {
    let client = ScriptedClient::new();
    client.script(
        "https://api-web.nhle.com/v1/ping",
        vec![Scripted::ok("{}")],
    );
    client.script(
        "https://api.nhle.com/stats/rest/ping",
        vec![Scripted::ok("{}")],
    );
    client.script(
        "https://hockeystandings.io/api/v1/ping",
        vec![Scripted::ok("{}")],
    );

    client.script(
        &format!("https://api-web.nhle.com/v1/schedule/{}", SEASON),
        vec![Scripted::ok(&format!(
            r#"{{"games": [{{"id": {}, "home_team": "BOS", "away_team": "TOR",
                             "home_score": 4, "away_score": 2}}]}}"#,
            GAME
        ))],
    );
    client.script(
        &format!("https://api-web.nhle.com/v1/gamecenter/{}/boxscore", GAME),
        vec![Scripted::ok(
            r#"{"home": {"team": "BOS", "goals": 4, "shots": 30},
                "away": {"team": "TOR", "goals": 2, "shots": 28},
                "players": [{"player_id": 8475745, "name": "Marchand",
                             "toi_seconds": 1130, "shift_count": 22}]}"#,
        )],
    );
    // Play-by-play disagrees on the away goal count.
    client.script(
        &format!(
            "https://api.nhle.com/stats/rest/en/game/{}/play-by-play",
            GAME
        ),
        vec![Scripted::ok(
            r#"{"home_goals": 4, "away_goals": 3, "home_shots": 31, "away_shots": 28}"#,
        )],
    );
    client.script(
        &format!(
            "https://api.nhle.com/stats/rest/en/shiftcharts?gameId={}",
            GAME
        ),
        vec![Scripted::ok(
            r#"{"players": [{"player_id": 8475745, "toi_seconds": 1132, "shift_count": 22}]}"#,
        )],
    );
    client.script(
        &format!("https://hockeystandings.io/api/v1/standings/{}", SEASON),
        vec![Scripted::ok(
            r#"{"teams": [{"team": "BOS", "games_played": 80, "wins": 40,
                           "losses": 30, "ot_losses": 10, "points": 90,
                           "goals_for": 250, "goals_against": 220}]}"#,
        )],
    );
    client
}

#[tokio::test]
async fn orchestrated_pass_validates_and_requeues_disagreeing_feed() {
    let state = tempdir().unwrap();
    let db = StatsDb::open_at(state.path().join("stats.db")).await.unwrap();
    let client = Arc::new(scripted_client());
    let handles =
        orchestrate::default_sources(Arc::clone(&client) as Arc<dyn HttpClient>, &db, &fast_config(), None);

    let report = orchestrate::run_season(&db, &handles, SEASON, false)
        .await
        .unwrap();

    // Every source completed its pass.
    assert_eq!(report.sources.len(), 4);
    for outcome in &report.sources {
        assert!(outcome.error.is_none(), "{:?}", outcome);
        assert_eq!(outcome.failed, 0, "{:?}", outcome);
    }

    // One game validated; its play-by-play goal count disagrees.
    assert_eq!(report.validation.games.len(), 1);
    assert_eq!(report.validation.games_with_discrepancies(), 1);
    let game = &report.validation.games[0];
    assert_eq!(game.failed, 1);
    assert!(game
        .results
        .iter()
        .any(|r| !r.passed && r.rule.starts_with("goals_away")));

    // Standings are internally consistent.
    let standings = report.validation.standings.as_ref().unwrap();
    assert_eq!(standings.failed, 0);

    // The disagreeing feed was handed back to the download layer.
    assert_eq!(report.requeued, 1);
    let events_rows = db.load_progress(SourceKind::Events, SEASON).await.unwrap();
    assert_eq!(events_rows.len(), 1);
    assert_eq!(events_rows[0].status, DownloadStatus::Pending);

    // Agreeing feeds stay completed.
    let shifts_rows = db.load_progress(SourceKind::Shifts, SEASON).await.unwrap();
    assert_eq!(shifts_rows[0].status, DownloadStatus::Completed);

    // The third-party source archived its raw response.
    let standings_rows = db
        .load_progress(SourceKind::Standings, SEASON)
        .await
        .unwrap();
    assert_eq!(standings_rows[0].status, DownloadStatus::Completed);

    // Each endpoint was hit exactly once.
    assert_eq!(
        client.hits(&format!(
            "https://hockeystandings.io/api/v1/standings/{}",
            SEASON
        )),
        1
    );
    assert_eq!(
        client.hits(&format!(
            "https://api-web.nhle.com/v1/gamecenter/{}/boxscore",
            GAME
        )),
        1
    );
}
