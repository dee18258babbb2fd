//! Season orchestration across sources.
//!
//! Drives one season end to end: health-gate each source, run the official
//! API first (its schedule enumerates the games), seed the per-game sources
//! from the schedule, run them concurrently, then reconcile and feed
//! error-severity discrepancies back into the trackers as re-fetch work for
//! the next pass.

use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinSet;

use crate::config::HsrConfig;
use crate::control::RunControl;
use crate::download::{
    ApiSource, DownloadResult, Downloader, EventsSource, ShiftsSource, StandingsSource,
};
use crate::http::HttpClient;
use crate::progress::{
    DownloadStatus, Feed, GameId, ItemKey, ProgressTracker, SeasonId, SourceKind,
};
use crate::store::StatsDb;
use crate::validate::{self, ScheduleRecord, SeasonValidation};

/// One source's downloader plus its tracker, as the orchestrator needs both:
/// the trait for downloading, the tracker for seeding and requeueing.
#[derive(Clone)]
pub struct SourceHandle {
    pub downloader: Arc<dyn Downloader>,
    pub tracker: Arc<ProgressTracker>,
}

impl SourceHandle {
    pub fn new(downloader: Arc<dyn Downloader>, tracker: Arc<ProgressTracker>) -> Self {
        Self {
            downloader,
            tracker,
        }
    }

    pub fn source(&self) -> SourceKind {
        self.downloader.source_name()
    }
}

/// Download tallies for one source's season pass.
#[derive(Debug, Clone, Default)]
pub struct SourceOutcome {
    pub source: Option<SourceKind>,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Systemic failure that aborted this source's pass, if any.
    pub error: Option<String>,
}

impl SourceOutcome {
    fn absorb(&mut self, result: &DownloadResult) {
        match result.status {
            DownloadStatus::Completed => self.completed += 1,
            DownloadStatus::Failed => self.failed += 1,
            DownloadStatus::Skipped => self.skipped += 1,
            _ => {}
        }
    }
}

/// Outcome of one orchestrated season pass.
#[derive(Debug)]
pub struct SeasonReport {
    pub season: SeasonId,
    pub sources: Vec<SourceOutcome>,
    pub validation: SeasonValidation,
    /// Items requeued because validation contradicted their feed.
    pub requeued: usize,
}

/// Compose the four standard source adapters over one client and store.
/// This is the one place the system is wired together at startup; nothing
/// here is cached globally.
pub fn default_sources(
    client: Arc<dyn HttpClient>,
    db: &StatsDb,
    cfg: &HsrConfig,
    control: Option<Arc<RunControl>>,
) -> Vec<SourceHandle> {
    let api = ApiSource::new(Arc::clone(&client), db.clone(), cfg, control.clone());
    let events = EventsSource::new(Arc::clone(&client), db.clone(), cfg, control.clone());
    let shifts = ShiftsSource::new(Arc::clone(&client), db.clone(), cfg, control.clone());
    let standings = StandingsSource::new(client, db.clone(), cfg, control);

    let api_tracker = api.tracker();
    let events_tracker = events.tracker();
    let shifts_tracker = shifts.tracker();
    let standings_tracker = standings.tracker();
    vec![
        SourceHandle::new(Arc::new(api), api_tracker),
        SourceHandle::new(Arc::new(events), events_tracker),
        SourceHandle::new(Arc::new(shifts), shifts_tracker),
        SourceHandle::new(Arc::new(standings), standings_tracker),
    ]
}

/// Run one full season pass over the given sources.
///
/// Per-item failures never abort the pass; a source that fails its health
/// check (or hits a repository error) is recorded and the others continue.
/// The validation stage always runs over whatever is stored.
pub async fn run_season(
    db: &StatsDb,
    handles: &[SourceHandle],
    season: SeasonId,
    force: bool,
) -> Result<SeasonReport> {
    let mut outcomes = Vec::new();

    // Schedule-bearing source first: it enumerates the games.
    if let Some(api) = handles.iter().find(|h| h.source() == SourceKind::Api) {
        outcomes.push(drive_source(api, season, force).await);
    }

    // Seed per-game sources from the stored schedule, then run everything
    // else concurrently. The per-source rate limiters keep each source
    // within its own budget regardless of this fan-out.
    let game_ids = schedule_game_ids(db, season).await;
    let mut join_set: JoinSet<SourceOutcome> = JoinSet::new();
    for handle in handles.iter().filter(|h| h.source() != SourceKind::Api) {
        let source = handle.source();
        if wants_game_seeds(source) {
            if let Err(e) = seed_games(handle, season, &game_ids).await {
                tracing::error!(source = source.as_str(), "seeding failed: {:#}", e);
                outcomes.push(SourceOutcome {
                    source: Some(source),
                    error: Some(format!("{:#}", e)),
                    ..SourceOutcome::default()
                });
                continue;
            }
        }
        let handle = handle.clone();
        join_set.spawn(async move { drive_source(&handle, season, force).await });
    }
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => tracing::error!("source task join: {}", e),
        }
    }

    let validation = validate::validate_season(db, season).await?;
    let requeued = requeue_discrepancies(handles, season, &validation).await;

    Ok(SeasonReport {
        season,
        sources: outcomes,
        validation,
        requeued,
    })
}

/// Probe every source once. Returns (source, healthy) pairs.
pub async fn health_report(handles: &[SourceHandle]) -> Vec<(SourceKind, bool)> {
    let mut out = Vec::with_capacity(handles.len());
    for handle in handles {
        out.push((handle.source(), handle.downloader.health_check().await));
    }
    out
}

async fn drive_source(handle: &SourceHandle, season: SeasonId, force: bool) -> SourceOutcome {
    let source = handle.source();
    let mut outcome = SourceOutcome {
        source: Some(source),
        ..SourceOutcome::default()
    };
    match handle.downloader.download_season(season, force).await {
        Ok(mut rx) => {
            while let Some(result) = rx.recv().await {
                outcome.absorb(&result);
            }
            tracing::info!(
                source = source.as_str(),
                season,
                completed = outcome.completed,
                failed = outcome.failed,
                skipped = outcome.skipped,
                "season pass finished"
            );
        }
        Err(e) => {
            tracing::error!(source = source.as_str(), season, "season pass aborted: {:#}", e);
            outcome.error = Some(format!("{:#}", e));
        }
    }
    outcome
}

fn wants_game_seeds(source: SourceKind) -> bool {
    matches!(source, SourceKind::Events | SourceKind::Shifts)
}

async fn schedule_game_ids(db: &StatsDb, season: SeasonId) -> Vec<GameId> {
    let payload = match db.load_payload(Feed::Schedule, season, None).await {
        Ok(Some(payload)) => payload,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(season, "schedule load failed: {:#}", e);
            return Vec::new();
        }
    };
    match serde_json::from_value::<ScheduleRecord>(payload) {
        Ok(schedule) => schedule.games.into_iter().map(|g| g.id).collect(),
        Err(e) => {
            tracing::warn!(season, "schedule undecodable: {}", e);
            Vec::new()
        }
    }
}

async fn seed_games(handle: &SourceHandle, season: SeasonId, games: &[GameId]) -> Result<()> {
    handle.tracker.load_state(handle.source(), season).await?;
    let keys: Vec<ItemKey> = games
        .iter()
        .map(|&game| ItemKey::game_item(handle.source(), season, game))
        .collect();
    let created = handle.tracker.ensure_items(&keys).await?;
    if created > 0 {
        tracing::info!(
            source = handle.source().as_str(),
            season,
            created,
            "seeded per-game items from schedule"
        );
    }
    Ok(())
}

/// Push error-severity discrepancies back into the download layer: the
/// implicated non-reference feeds are requeued so the next pass re-fetches
/// them. Returns how many items were requeued.
async fn requeue_discrepancies(
    handles: &[SourceHandle],
    season: SeasonId,
    validation: &SeasonValidation,
) -> usize {
    let tracker_for = |source: SourceKind| {
        handles
            .iter()
            .find(|h| h.source() == source)
            .map(|h| Arc::clone(&h.tracker))
    };

    let mut keys = std::collections::HashSet::new();
    for summary in &validation.games {
        let Ok(game) = summary.entity.parse::<GameId>() else {
            continue;
        };
        for feed in summary.feeds_with_errors() {
            match feed {
                Feed::PlayByPlay => {
                    keys.insert(ItemKey::game_item(SourceKind::Events, season, game));
                }
                Feed::Shifts => {
                    keys.insert(ItemKey::game_item(SourceKind::Shifts, season, game));
                }
                Feed::Schedule => {
                    keys.insert(ItemKey::season_item(SourceKind::Api, season));
                }
                // The reference feed itself is not requeued.
                Feed::Boxscore | Feed::Standings => {}
            }
        }
    }
    if let Some(standings) = &validation.standings {
        if standings.has_discrepancies() {
            keys.insert(ItemKey::season_item(SourceKind::Standings, season));
        }
    }

    let mut requeued = 0usize;
    for key in keys {
        let Some(tracker) = tracker_for(key.source) else {
            continue;
        };
        match tracker.requeue_item(key).await {
            Ok(()) => {
                requeued += 1;
                tracing::info!(item = %key, "requeued after validation discrepancy");
            }
            Err(e) => tracing::warn!(item = %key, "requeue failed: {:#}", e),
        }
    }

    requeued
}
