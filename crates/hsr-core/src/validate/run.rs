//! Validation entry points over stored payloads.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::progress::{Feed, GameId, SeasonId};
use crate::store::StatsDb;

use super::cross;
use super::internal;
use super::records::{GameBoxscore, GameFeeds, PbpSummary, ScheduleRecord, ShiftsRecord, StandingsRecord};
use super::result::{ValidationScope, ValidationSummary};

/// Season-wide validation outcome: one summary per validated game plus the
/// standings internal-consistency summary when standings are on hand.
#[derive(Debug)]
pub struct SeasonValidation {
    pub season: SeasonId,
    pub games: Vec<ValidationSummary>,
    pub standings: Option<ValidationSummary>,
    /// Schedule games with no stored boxscore; skipped, not failed.
    pub games_without_boxscore: usize,
}

impl SeasonValidation {
    pub fn games_with_discrepancies(&self) -> usize {
        self.games.iter().filter(|g| g.has_discrepancies()).count()
    }
}

/// Reconcile one game across whatever feeds are stored for it.
///
/// The boxscore is the mandatory reference: its absence (or storage being
/// unreachable) is an operational error. Optional feeds that are missing or
/// unreadable are skipped.
pub async fn validate_game(
    db: &StatsDb,
    season: SeasonId,
    game: GameId,
) -> Result<ValidationSummary> {
    let boxscore: GameBoxscore = db
        .load_payload(Feed::Boxscore, season, Some(game))
        .await?
        .map(serde_json::from_value)
        .transpose()
        .with_context(|| format!("decode boxscore payload for game {}", game))?
        .ok_or_else(|| anyhow::anyhow!("no boxscore stored for game {}", game))?;

    let play_by_play: Option<PbpSummary> =
        load_optional(db, Feed::PlayByPlay, season, Some(game)).await;
    let shifts: Option<ShiftsRecord> = load_optional(db, Feed::Shifts, season, Some(game)).await;
    let schedule = load_optional::<ScheduleRecord>(db, Feed::Schedule, season, None)
        .await
        .and_then(|record| record.game(game).cloned());

    let feeds = GameFeeds {
        boxscore,
        play_by_play,
        shifts,
        schedule,
    };
    let results = cross::validate_all(&feeds);
    Ok(ValidationSummary::from_results(
        ValidationScope::Game,
        game.to_string(),
        results,
    ))
}

/// Reconcile every game of a season that has a boxscore, plus the standings.
/// Always completes and reports; only storage failures are errors.
pub async fn validate_season(db: &StatsDb, season: SeasonId) -> Result<SeasonValidation> {
    let game_ids = db.list_feed_games(Feed::Boxscore, season).await?;

    let mut games = Vec::with_capacity(game_ids.len());
    for game in &game_ids {
        games.push(validate_game(db, season, *game).await?);
    }

    let games_without_boxscore = match load_optional::<ScheduleRecord>(db, Feed::Schedule, season, None).await
    {
        Some(schedule) => schedule
            .games
            .iter()
            .filter(|g| !game_ids.contains(&g.id))
            .count(),
        None => 0,
    };
    if games_without_boxscore > 0 {
        tracing::warn!(
            season,
            games_without_boxscore,
            "scheduled games skipped for lack of a boxscore"
        );
    }

    let standings = load_optional::<StandingsRecord>(db, Feed::Standings, season, None)
        .await
        .map(|record| internal::summarize_standings(&record, format!("standings-{}", season)));

    Ok(SeasonValidation {
        season,
        games,
        standings,
        games_without_boxscore,
    })
}

/// Load and decode an optional feed payload; anything short of a usable
/// record (absent row, undecodable JSON) is None.
async fn load_optional<T: DeserializeOwned>(
    db: &StatsDb,
    feed: Feed,
    season: SeasonId,
    game: Option<GameId>,
) -> Option<T> {
    let payload = match db.load_payload(feed, season, game).await {
        Ok(Some(payload)) => payload,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(feed = feed.as_str(), season, "payload load failed: {:#}", e);
            return None;
        }
    };
    match serde_json::from_value(payload) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(feed = feed.as_str(), season, "payload undecodable: {}", e);
            None
        }
    }
}
