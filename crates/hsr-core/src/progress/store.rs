//! Repository collaborator for progress persistence.

use anyhow::Result;
use async_trait::async_trait;

use super::entry::ProgressEntry;
use super::key::{SeasonId, SourceKind};

/// Narrow persistence interface consumed by the tracker. The core never
/// issues storage queries itself; `StatsDb` provides the SQLite-backed
/// implementation.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// All persisted entries for one (source, season).
    async fn load(&self, source: SourceKind, season: SeasonId) -> Result<Vec<ProgressEntry>>;

    /// Insert or update one entry by its natural key.
    async fn upsert(&self, entry: &ProgressEntry) -> Result<()>;

    /// Normalize rows left `downloading` by a dead run back to `pending`
    /// so they are re-enumerated. Returns the number of rows reset.
    async fn reset_stale_downloading(&self, source: SourceKind, season: SeasonId) -> Result<u64>;
}
