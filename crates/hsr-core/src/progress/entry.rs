//! Persisted progress record and its status machine.

use std::time::{SystemTime, UNIX_EPOCH};

use super::key::ItemKey;

/// Lifecycle state of one download item, stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
    Skipped,
}

impl DownloadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Failed => "failed",
            DownloadStatus::Skipped => "skipped",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => DownloadStatus::Pending,
            "downloading" => DownloadStatus::Downloading,
            "completed" => DownloadStatus::Completed,
            "skipped" => DownloadStatus::Skipped,
            _ => DownloadStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DownloadStatus::Completed | DownloadStatus::Failed | DownloadStatus::Skipped
        )
    }
}

/// Progress record keyed by (source, season, item-or-null).
///
/// Mutated only through the tracker API; everything else sees clones.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEntry {
    pub key: ItemKey,
    pub status: DownloadStatus,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl ProgressEntry {
    /// Fresh entry for newly enumerated work.
    pub fn pending(key: ItemKey) -> Self {
        Self {
            key,
            status: DownloadStatus::Pending,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            last_error: None,
        }
    }
}

/// Per-status tally for one (source, season), used by status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub downloading: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.downloading + self.completed + self.failed + self.skipped
    }
}

/// Current time as Unix seconds (for entry timestamps and DB rows).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
