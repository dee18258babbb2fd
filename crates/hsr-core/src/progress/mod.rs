//! Resumable per-item progress tracking.
//!
//! The tracker owns the completion state of (source, season, item) keys and
//! is the single writer of that state: downloads report transitions through
//! its API, and persistence goes through the `ProgressStore` repository
//! collaborator. A transition is committed only once the store write
//! succeeds; on store failure the in-memory state is rolled back so memory
//! and disk never diverge silently.

mod entry;
mod key;
mod store;
mod tracker;

pub use entry::{DownloadStatus, ProgressEntry, StatusCounts};
pub use key::{Feed, GameId, ItemKey, SeasonId, SourceKind};
pub use store::ProgressStore;
pub use tracker::{ProgressTracker, TrackerError};

pub(crate) use entry::unix_timestamp;
