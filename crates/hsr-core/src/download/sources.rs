//! Concrete source adapters.
//!
//! Each adapter is a thin shell over `SourceEngine` with its own endpoint
//! layout. They satisfy the `Downloader` contract independently; nothing
//! shares a base type.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::HsrConfig;
use crate::control::RunControl;
use crate::http::HttpClient;
use crate::progress::{ItemKey, ProgressTracker, SeasonId, SourceKind};
use crate::store::StatsDb;

use super::engine::SourceEngine;
use super::result::DownloadResult;
use super::source_spec::{Enumeration, SourceSpec};
use super::Downloader;

/// Official JSON API: season schedule plus per-game boxscores.
const API_SCHEDULE_URL: &str = "https://api-web.nhle.com/v1/schedule/{season}";
const API_BOXSCORE_URL: &str = "https://api-web.nhle.com/v1/gamecenter/{game}/boxscore";
const API_HEALTH_URL: &str = "https://api-web.nhle.com/v1/ping";

/// Stats REST API: play-by-play event summaries and shift charts.
const EVENTS_URL: &str = "https://api.nhle.com/stats/rest/en/game/{game}/play-by-play";
const SHIFTS_URL: &str = "https://api.nhle.com/stats/rest/en/shiftcharts?gameId={game}";
const STATS_REST_HEALTH_URL: &str = "https://api.nhle.com/stats/rest/ping";

/// Third-party standings mirror; responses are archived raw.
const STANDINGS_URL: &str = "https://hockeystandings.io/api/v1/standings/{season}";
const STANDINGS_HEALTH_URL: &str = "https://hockeystandings.io/api/v1/ping";

macro_rules! delegate_downloader {
    ($adapter:ty) => {
        #[async_trait]
        impl Downloader for $adapter {
            fn source_name(&self) -> SourceKind {
                self.engine.source()
            }

            async fn download_season(
                &self,
                season: SeasonId,
                force: bool,
            ) -> Result<mpsc::Receiver<DownloadResult>> {
                Arc::clone(&self.engine).download_season(season, force).await
            }

            async fn download_item(&self, key: ItemKey) -> Result<DownloadResult> {
                self.engine.download_item(key).await
            }

            async fn health_check(&self) -> bool {
                self.engine.health_check().await
            }
        }

        impl $adapter {
            pub fn tracker(&self) -> Arc<ProgressTracker> {
                self.engine.tracker()
            }
        }
    };
}

/// Official JSON API adapter. Aggressive budget; the schedule season item
/// enumerates the games that seed every other source.
pub struct ApiSource {
    engine: Arc<SourceEngine>,
}

impl ApiSource {
    pub fn new(
        client: Arc<dyn HttpClient>,
        db: StatsDb,
        cfg: &HsrConfig,
        control: Option<Arc<RunControl>>,
    ) -> Self {
        let spec = SourceSpec {
            source: SourceKind::Api,
            enumeration: Enumeration::FetchIndex,
            archive_raw: false,
            season_url: Some(API_SCHEDULE_URL.to_string()),
            item_url: Some(API_BOXSCORE_URL.to_string()),
            health_url: API_HEALTH_URL.to_string(),
        };
        Self {
            engine: Arc::new(build_engine(spec, client, db, cfg, control)),
        }
    }
}

delegate_downloader!(ApiSource);

/// Play-by-play adapter over the stats REST API. Works on items seeded from
/// the schedule.
pub struct EventsSource {
    engine: Arc<SourceEngine>,
}

impl EventsSource {
    pub fn new(
        client: Arc<dyn HttpClient>,
        db: StatsDb,
        cfg: &HsrConfig,
        control: Option<Arc<RunControl>>,
    ) -> Self {
        let spec = SourceSpec {
            source: SourceKind::Events,
            enumeration: Enumeration::TrackerOnly,
            archive_raw: false,
            season_url: None,
            item_url: Some(EVENTS_URL.to_string()),
            health_url: STATS_REST_HEALTH_URL.to_string(),
        };
        Self {
            engine: Arc::new(build_engine(spec, client, db, cfg, control)),
        }
    }
}

delegate_downloader!(EventsSource);

/// Shift chart adapter over the stats REST API.
pub struct ShiftsSource {
    engine: Arc<SourceEngine>,
}

impl ShiftsSource {
    pub fn new(
        client: Arc<dyn HttpClient>,
        db: StatsDb,
        cfg: &HsrConfig,
        control: Option<Arc<RunControl>>,
    ) -> Self {
        let spec = SourceSpec {
            source: SourceKind::Shifts,
            enumeration: Enumeration::TrackerOnly,
            archive_raw: false,
            season_url: None,
            item_url: Some(SHIFTS_URL.to_string()),
            health_url: STATS_REST_HEALTH_URL.to_string(),
        };
        Self {
            engine: Arc::new(build_engine(spec, client, db, cfg, control)),
        }
    }
}

delegate_downloader!(ShiftsSource);

/// Third-party standings adapter. Conservative budget, original response
/// bytes archived for audit.
pub struct StandingsSource {
    engine: Arc<SourceEngine>,
}

impl StandingsSource {
    pub fn new(
        client: Arc<dyn HttpClient>,
        db: StatsDb,
        cfg: &HsrConfig,
        control: Option<Arc<RunControl>>,
    ) -> Self {
        let spec = SourceSpec {
            source: SourceKind::Standings,
            enumeration: Enumeration::SeasonItem,
            archive_raw: true,
            season_url: Some(STANDINGS_URL.to_string()),
            item_url: None,
            health_url: STANDINGS_HEALTH_URL.to_string(),
        };
        Self {
            engine: Arc::new(build_engine(spec, client, db, cfg, control)),
        }
    }
}

delegate_downloader!(StandingsSource);

fn build_engine(
    spec: SourceSpec,
    client: Arc<dyn HttpClient>,
    db: StatsDb,
    cfg: &HsrConfig,
    control: Option<Arc<RunControl>>,
) -> SourceEngine {
    let engine = SourceEngine::new(spec, client, db, cfg);
    match control {
        Some(control) => engine.with_control(control),
        None => engine,
    }
}
