//! Download orchestration: the source contract and its shared engine.
//!
//! Every source adapter composes the same machinery: a rate limiter tuned to
//! the source's budget, the retry handler, the progress tracker, and the
//! HTTP client collaborator. The adapters differ only in endpoints,
//! enumeration strategy, and the parser that turns response bytes into a
//! structured payload.

mod engine;
mod result;
mod source_spec;
mod sources;

pub use engine::SourceEngine;
pub use result::DownloadResult;
pub use source_spec::{Enumeration, FeedParser, JsonFeedParser, SourceSpec};
pub use sources::{ApiSource, EventsSource, ShiftsSource, StandingsSource};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::progress::{ItemKey, SeasonId, SourceKind};

/// Contract every source adapter satisfies. No common base type is required;
/// any type with these methods composes into the orchestrator.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Stable identifier of the source.
    fn source_name(&self) -> SourceKind;

    /// Download everything this source has for a season, yielding one
    /// `DownloadResult` per item as it finishes (completion order, not
    /// enumeration order). Per-item failures appear as Failed results and do
    /// not abort the rest; systemic failures (unreachable source, repository
    /// errors, index fetch failure) are the `Err` arm. Each call
    /// re-enumerates pending work from the progress tracker, so a fresh call
    /// resumes across process restarts. `force` re-fetches items that are
    /// already satisfied.
    async fn download_season(
        &self,
        season: SeasonId,
        force: bool,
    ) -> Result<mpsc::Receiver<DownloadResult>>;

    /// Fetch one item now, regardless of prior state.
    async fn download_item(&self, key: ItemKey) -> Result<DownloadResult>;

    /// Cheap reachability probe. Consumes a rate-limit token like any fetch.
    async fn health_check(&self) -> bool;
}
