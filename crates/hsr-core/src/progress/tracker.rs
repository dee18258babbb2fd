//! In-memory progress state with write-through persistence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::entry::{unix_timestamp, DownloadStatus, ProgressEntry, StatusCounts};
use super::key::{ItemKey, SeasonId, SourceKind};
use super::store::ProgressStore;

/// Error surface of tracker transitions.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("unknown item {0}")]
    UnknownKey(ItemKey),
    #[error("invalid transition for {key}: {from:?} -> {to:?}")]
    InvalidTransition {
        key: ItemKey,
        from: DownloadStatus,
        to: DownloadStatus,
    },
    #[error("progress store: {0:#}")]
    Store(anyhow::Error),
}

/// Tracks (source, season, item) completion state.
///
/// A single coarse lock guards the map; it is held only for in-memory reads
/// and transitions, never across store I/O. Transitions are applied in
/// memory first, then persisted; if the store write fails the in-memory
/// entry is rolled back to its previous value and the error is surfaced.
pub struct ProgressTracker {
    store: Arc<dyn ProgressStore>,
    entries: Mutex<HashMap<ItemKey, ProgressEntry>>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self {
            store,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Hydrate in-memory state for one (source, season) from the store.
    ///
    /// Rows left `downloading` by an interrupted run have no in-memory owner
    /// anymore; they are reset to `pending` (persisted) before loading so a
    /// restarted run re-attempts them instead of treating them as in
    /// progress elsewhere.
    pub async fn load_state(
        &self,
        source: SourceKind,
        season: SeasonId,
    ) -> Result<usize, TrackerError> {
        let reset = self
            .store
            .reset_stale_downloading(source, season)
            .await
            .map_err(TrackerError::Store)?;
        if reset > 0 {
            tracing::info!(
                source = source.as_str(),
                season,
                reset,
                "recovered interrupted items from previous run"
            );
        }

        let loaded = self
            .store
            .load(source, season)
            .await
            .map_err(TrackerError::Store)?;
        let count = loaded.len();

        let mut entries = self.entries.lock().unwrap();
        entries.retain(|k, _| !(k.source == source && k.season == season));
        for entry in loaded {
            entries.insert(entry.key, entry);
        }
        Ok(count)
    }

    /// Create `pending` entries for keys not seen before. Existing entries
    /// (any status) are left untouched, so re-enumeration never duplicates
    /// or regresses prior work. Returns how many entries were created.
    pub async fn ensure_items(&self, keys: &[ItemKey]) -> Result<usize, TrackerError> {
        let mut created = 0usize;
        for &key in keys {
            let exists = self.entries.lock().unwrap().contains_key(&key);
            if exists {
                continue;
            }
            let entry = ProgressEntry::pending(key);
            // Persist before exposing the entry; a failed insert leaves no
            // half-created state to roll back.
            self.store
                .upsert(&entry)
                .await
                .map_err(TrackerError::Store)?;
            self.entries.lock().unwrap().insert(key, entry);
            created += 1;
        }
        Ok(created)
    }

    /// PENDING/FAILED -> DOWNLOADING. Idempotent when the item is already
    /// downloading. Completed or skipped items reject the transition.
    pub async fn start_item(&self, key: ItemKey) -> Result<(), TrackerError> {
        let prev = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .get_mut(&key)
                .ok_or(TrackerError::UnknownKey(key))?;
            match entry.status {
                DownloadStatus::Downloading => return Ok(()),
                DownloadStatus::Pending | DownloadStatus::Failed => {}
                from => {
                    return Err(TrackerError::InvalidTransition {
                        key,
                        from,
                        to: DownloadStatus::Downloading,
                    })
                }
            }
            let prev = entry.clone();
            entry.status = DownloadStatus::Downloading;
            entry.started_at = Some(unix_timestamp());
            prev
        };
        self.persist_or_rollback(key, prev).await
    }

    /// DOWNLOADING/PENDING -> COMPLETED. `attempts` is the number of fetch
    /// attempts the item took; retries needed for the eventual success are
    /// recorded as `retry_count = attempts - 1`.
    pub async fn complete_item(&self, key: ItemKey, attempts: u32) -> Result<(), TrackerError> {
        let prev = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .get_mut(&key)
                .ok_or(TrackerError::UnknownKey(key))?;
            if entry.status.is_terminal() {
                return Err(TrackerError::InvalidTransition {
                    key,
                    from: entry.status,
                    to: DownloadStatus::Completed,
                });
            }
            let prev = entry.clone();
            entry.status = DownloadStatus::Completed;
            entry.completed_at = Some(unix_timestamp());
            entry.retry_count = attempts.saturating_sub(1);
            entry.last_error = None;
            prev
        };
        self.persist_or_rollback(key, prev).await
    }

    /// DOWNLOADING/PENDING -> FAILED. Records the error and adds the
    /// attempts consumed by this run to `retry_count`.
    pub async fn fail_item(
        &self,
        key: ItemKey,
        error: &str,
        attempts: u32,
    ) -> Result<(), TrackerError> {
        let prev = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .get_mut(&key)
                .ok_or(TrackerError::UnknownKey(key))?;
            if matches!(
                entry.status,
                DownloadStatus::Completed | DownloadStatus::Skipped
            ) {
                return Err(TrackerError::InvalidTransition {
                    key,
                    from: entry.status,
                    to: DownloadStatus::Failed,
                });
            }
            let prev = entry.clone();
            entry.status = DownloadStatus::Failed;
            entry.completed_at = Some(unix_timestamp());
            entry.retry_count = entry.retry_count.saturating_add(attempts.max(1));
            entry.last_error = Some(error.to_string());
            prev
        };
        self.persist_or_rollback(key, prev).await
    }

    /// PENDING -> SKIPPED, for items already satisfied by a prior run.
    pub async fn skip_item(&self, key: ItemKey) -> Result<(), TrackerError> {
        let prev = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .get_mut(&key)
                .ok_or(TrackerError::UnknownKey(key))?;
            if entry.status != DownloadStatus::Pending {
                return Err(TrackerError::InvalidTransition {
                    key,
                    from: entry.status,
                    to: DownloadStatus::Skipped,
                });
            }
            let prev = entry.clone();
            entry.status = DownloadStatus::Skipped;
            entry.completed_at = Some(unix_timestamp());
            prev
        };
        self.persist_or_rollback(key, prev).await
    }

    /// Terminal -> PENDING, used when validation discrepancies demand a
    /// re-fetch of a feed that already completed. Retry history is kept.
    pub async fn requeue_item(&self, key: ItemKey) -> Result<(), TrackerError> {
        let prev = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .get_mut(&key)
                .ok_or(TrackerError::UnknownKey(key))?;
            if entry.status == DownloadStatus::Pending {
                return Ok(());
            }
            if entry.status == DownloadStatus::Downloading {
                return Err(TrackerError::InvalidTransition {
                    key,
                    from: entry.status,
                    to: DownloadStatus::Pending,
                });
            }
            let prev = entry.clone();
            entry.status = DownloadStatus::Pending;
            entry.completed_at = None;
            prev
        };
        self.persist_or_rollback(key, prev).await
    }

    pub fn is_pending(&self, key: &ItemKey) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|e| e.status == DownloadStatus::Pending)
            .unwrap_or(false)
    }

    pub fn entry(&self, key: &ItemKey) -> Option<ProgressEntry> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Keys for one (source, season) that still need a fetch: `pending` plus
    /// `failed` (failures are re-attempted on the next pass). With `force`,
    /// every known key is returned regardless of status. Sorted by game id
    /// (season item first) for stable enumeration.
    pub fn pending_items(
        &self,
        source: SourceKind,
        season: SeasonId,
        force: bool,
    ) -> Vec<ItemKey> {
        let entries = self.entries.lock().unwrap();
        let mut keys: Vec<ItemKey> = entries
            .values()
            .filter(|e| e.key.source == source && e.key.season == season)
            .filter(|e| {
                force
                    || matches!(
                        e.status,
                        DownloadStatus::Pending | DownloadStatus::Failed
                    )
            })
            .map(|e| e.key)
            .collect();
        keys.sort_by_key(|k| k.game);
        keys
    }

    /// Per-status tally for one (source, season).
    pub fn counts(&self, source: SourceKind, season: SeasonId) -> StatusCounts {
        let entries = self.entries.lock().unwrap();
        let mut counts = StatusCounts::default();
        for entry in entries
            .values()
            .filter(|e| e.key.source == source && e.key.season == season)
        {
            match entry.status {
                DownloadStatus::Pending => counts.pending += 1,
                DownloadStatus::Downloading => counts.downloading += 1,
                DownloadStatus::Completed => counts.completed += 1,
                DownloadStatus::Failed => counts.failed += 1,
                DownloadStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    async fn persist_or_rollback(
        &self,
        key: ItemKey,
        prev: ProgressEntry,
    ) -> Result<(), TrackerError> {
        let next = self
            .entries
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or(TrackerError::UnknownKey(key))?;
        match self.store.upsert(&next).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.entries.lock().unwrap().insert(key, prev);
                Err(TrackerError::Store(e))
            }
        }
    }
}
