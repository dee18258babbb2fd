//! Shared per-source download engine.
//!
//! Composes the rate limiter, retry handler, progress tracker, HTTP client,
//! and parser into the item pipeline: acquire permit -> retry-wrapped fetch
//! and parse -> persist payload -> record tracker outcome -> yield result.
//! Season passes fan items out over a JoinSet worker pool; the pool size
//! bounds in-flight work while the limiter bounds request rate.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::HsrConfig;
use crate::control::RunControl;
use crate::http::{FetchRequest, HttpClient};
use crate::progress::{DownloadStatus, ItemKey, ProgressTracker, SeasonId, SourceKind};
use crate::ratelimit::RateLimiter;
use crate::retry::{run_with_retry, Retried, RetryError, RetryPolicy};
use crate::store::StatsDb;

use super::result::DownloadResult;
use super::source_spec::{Enumeration, FeedParser, JsonFeedParser, SourceSpec};

/// Buffered results between the season pass and its consumer.
const RESULT_CHANNEL_CAPACITY: usize = 64;

pub struct SourceEngine {
    spec: SourceSpec,
    client: Arc<dyn HttpClient>,
    db: StatsDb,
    tracker: Arc<ProgressTracker>,
    limiter: RateLimiter,
    policy: RetryPolicy,
    timeout: Duration,
    workers: usize,
    parser: Arc<dyn FeedParser>,
    control: Option<Arc<RunControl>>,
}

impl SourceEngine {
    pub fn new(spec: SourceSpec, client: Arc<dyn HttpClient>, db: StatsDb, cfg: &HsrConfig) -> Self {
        let budget = match spec.source {
            SourceKind::Api => cfg.budgets.api,
            SourceKind::Events => cfg.budgets.events,
            SourceKind::Shifts => cfg.budgets.shifts,
            SourceKind::Standings => cfg.budgets.standings,
        };
        let policy = cfg
            .retry
            .as_ref()
            .map(RetryPolicy::from_config)
            .unwrap_or_default();
        let tracker = Arc::new(ProgressTracker::new(Arc::new(db.clone())));
        Self {
            spec,
            client,
            db,
            tracker,
            limiter: RateLimiter::new(budget),
            policy,
            timeout: Duration::from_secs(cfg.fetch_timeout_secs.max(1)),
            workers: cfg.worker_pool_size.max(1),
            parser: Arc::new(JsonFeedParser),
            control: None,
        }
    }

    /// Swap in a source-specific parser (report-variant parsers plug in here).
    pub fn with_parser(mut self, parser: Arc<dyn FeedParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Attach an abort registry so season passes can be cancelled.
    pub fn with_control(mut self, control: Arc<RunControl>) -> Self {
        self.control = Some(control);
        self
    }

    pub fn source(&self) -> SourceKind {
        self.spec.source
    }

    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    /// Cheap reachability probe; consumes a rate-limit token like any fetch.
    pub async fn health_check(&self) -> bool {
        if self.limiter.acquire().await.is_err() {
            return false;
        }
        let req = FetchRequest::new(&self.spec.health_url, self.timeout);
        match self.client.fetch(req).await.and_then(|r| r.into_success()) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    source = self.spec.source.as_str(),
                    error = %e,
                    "health check failed"
                );
                false
            }
        }
    }

    /// Fetch one item end to end. Fetch failures are recorded and returned
    /// as Failed results; only tracker/store problems are `Err`.
    pub async fn fetch_item(&self, key: ItemKey) -> Result<DownloadResult> {
        self.tracker.start_item(key).await?;
        self.limiter.acquire().await?;

        match self.fetch_payload(&key).await {
            Ok(done) => {
                let (payload, raw) = done.value;
                let digest = self
                    .db
                    .save_payload(key.feed(), key.season, key.game, &payload, raw.as_deref())
                    .await
                    .with_context(|| format!("persist payload for {}", key))?;
                self.tracker.complete_item(key, done.attempts).await?;
                tracing::debug!(item = %key, attempts = done.attempts, "item downloaded");
                Ok(DownloadResult::completed(key, payload, digest, done.attempts))
            }
            Err(err) => {
                let attempts = err.attempts();
                let msg = err.cause().to_string();
                self.tracker.fail_item(key, &msg, attempts).await?;
                tracing::warn!(item = %key, attempts, error = %msg, "item download failed");
                Ok(DownloadResult::failed(key, Some(msg), attempts))
            }
        }
    }

    /// Fetch one item regardless of prior state (explicit single-item pull).
    pub async fn download_item(&self, key: ItemKey) -> Result<DownloadResult> {
        anyhow::ensure!(
            key.source == self.spec.source,
            "item {} does not belong to source {}",
            key,
            self.spec.source.as_str()
        );
        self.tracker.load_state(key.source, key.season).await?;
        self.tracker.ensure_items(std::slice::from_ref(&key)).await?;
        if let Some(entry) = self.tracker.entry(&key) {
            if entry.status.is_terminal() {
                self.tracker.requeue_item(key).await?;
            }
        }
        self.fetch_item(key).await
    }

    /// Run a whole season pass, yielding results as items finish.
    pub async fn download_season(
        self: Arc<Self>,
        season: SeasonId,
        force: bool,
    ) -> Result<mpsc::Receiver<DownloadResult>> {
        if !self.health_check().await {
            anyhow::bail!(
                "source {} failed health check; aborting season {}",
                self.spec.source.as_str(),
                season
            );
        }

        self.tracker.load_state(self.spec.source, season).await?;
        let index_result = self.enumerate(season, force).await?;
        let keys = self.tracker.pending_items(self.spec.source, season, true);

        let abort = self
            .control
            .as_ref()
            .map(|c| c.register(self.spec.source, season));

        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        let engine = Arc::clone(&self);
        tokio::spawn(async move {
            engine
                .run_items(season, keys, force, index_result, abort, tx)
                .await;
        });
        Ok(rx)
    }

    /// Make sure the tracker knows every item of this season. For index
    /// sources this fetches (or reuses) the schedule and seeds one item per
    /// game; the fetched index result, if any, is yielded to the caller
    /// ahead of the per-game results.
    async fn enumerate(&self, season: SeasonId, force: bool) -> Result<Option<DownloadResult>> {
        let index_key = ItemKey::season_item(self.spec.source, season);
        match self.spec.enumeration {
            Enumeration::TrackerOnly => Ok(None),
            Enumeration::SeasonItem => {
                self.tracker.ensure_items(&[index_key]).await?;
                Ok(None)
            }
            Enumeration::FetchIndex => {
                self.tracker.ensure_items(&[index_key]).await?;
                let status = self
                    .tracker
                    .entry(&index_key)
                    .map(|e| e.status)
                    .unwrap_or(DownloadStatus::Pending);

                let mut index_result = None;
                let payload = if status == DownloadStatus::Completed && !force {
                    self.db
                        .load_payload(index_key.feed(), season, None)
                        .await?
                } else {
                    None
                };
                let payload = match payload {
                    Some(p) => p,
                    None => {
                        if status.is_terminal() {
                            self.tracker.requeue_item(index_key).await?;
                        }
                        let result = self.fetch_item(index_key).await?;
                        if !result.is_successful() {
                            // Fall back to a previously stored schedule; with
                            // neither, the season cannot be enumerated.
                            match self.db.load_payload(index_key.feed(), season, None).await? {
                                Some(stale) => {
                                    tracing::warn!(
                                        season,
                                        "schedule refresh failed; enumerating from stored copy"
                                    );
                                    index_result = Some(result);
                                    stale
                                }
                                None => anyhow::bail!(
                                    "cannot enumerate season {}: {}",
                                    season,
                                    result.error.as_deref().unwrap_or("schedule fetch failed")
                                ),
                            }
                        } else {
                            let payload = result.payload.clone();
                            index_result = Some(result);
                            payload
                        }
                    }
                };

                let ids = self
                    .parser
                    .parse_index(&payload)
                    .map_err(|e| anyhow::anyhow!("parse season {} index: {}", season, e))?;
                let keys: Vec<ItemKey> = ids
                    .into_iter()
                    .map(|game| ItemKey::game_item(self.spec.source, season, game))
                    .collect();
                let created = self.tracker.ensure_items(&keys).await?;
                if created > 0 {
                    tracing::info!(
                        source = self.spec.source.as_str(),
                        season,
                        created,
                        "enumerated new season items"
                    );
                }
                Ok(index_result)
            }
        }
    }

    async fn run_items(
        self: Arc<Self>,
        season: SeasonId,
        keys: Vec<ItemKey>,
        force: bool,
        index_result: Option<DownloadResult>,
        abort: Option<Arc<AtomicBool>>,
        tx: mpsc::Sender<DownloadResult>,
    ) {
        let mut queue: VecDeque<ItemKey> = keys.into();
        let mut join_set: JoinSet<Result<DownloadResult>> = JoinSet::new();
        let mut receiver_gone = false;

        if let Some(result) = index_result {
            let key = result.key();
            queue.retain(|k| *k != key);
            receiver_gone = tx.send(result).await.is_err();
        }

        'pass: while !receiver_gone {
            while join_set.len() < self.workers {
                if abort.as_ref().is_some_and(|t| t.load(Ordering::Relaxed)) {
                    tracing::info!(
                        source = self.spec.source.as_str(),
                        season,
                        remaining = queue.len(),
                        "season pass aborted; unstarted items stay pending"
                    );
                    queue.clear();
                    break;
                }
                let Some(key) = queue.pop_front() else { break };

                let status = self
                    .tracker
                    .entry(&key)
                    .map(|e| e.status)
                    .unwrap_or(DownloadStatus::Pending);
                match status {
                    DownloadStatus::Completed | DownloadStatus::Skipped if !force => {
                        if tx.send(DownloadResult::skipped(key)).await.is_err() {
                            receiver_gone = true;
                            break 'pass;
                        }
                        continue;
                    }
                    // Owned by a concurrent pass; leave it alone.
                    DownloadStatus::Downloading => continue,
                    _ => {}
                }
                if force && status.is_terminal() {
                    if let Err(e) = self.tracker.requeue_item(key).await {
                        tracing::error!(item = %key, "requeue for force re-fetch: {:#}", e);
                        break 'pass;
                    }
                }

                let engine = Arc::clone(&self);
                join_set.spawn(async move { engine.fetch_item(key).await });
            }

            if join_set.is_empty() {
                break;
            }
            match join_set.join_next().await {
                Some(Ok(Ok(result))) => {
                    if tx.send(result).await.is_err() {
                        receiver_gone = true;
                    }
                }
                Some(Ok(Err(e))) => {
                    // Repository-level failure: the pass cannot make
                    // trustworthy progress records any more.
                    tracing::error!(
                        source = self.spec.source.as_str(),
                        season,
                        "stopping season pass: {:#}",
                        e
                    );
                    break;
                }
                Some(Err(join_err)) => {
                    tracing::error!("item task join: {}", join_err);
                }
                None => break,
            }
        }

        // Let in-flight items finish so every started item reaches a
        // terminal tracker state before the pass ends.
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok(Ok(result)) => {
                    if !receiver_gone && tx.send(result).await.is_err() {
                        receiver_gone = true;
                    }
                }
                Ok(Err(e)) => tracing::error!("item finished with error: {:#}", e),
                Err(join_err) => tracing::error!("item task join: {}", join_err),
            }
        }

        if let Some(control) = &self.control {
            control.unregister(self.spec.source, season);
        }
    }

    async fn fetch_payload(
        &self,
        key: &ItemKey,
    ) -> Result<Retried<(serde_json::Value, Option<Vec<u8>>)>, RetryError> {
        let url = self.spec.url_for(key).map_err(|e| RetryError::Fatal {
            attempts: 1,
            error: e,
        })?;

        run_with_retry(&self.policy, || {
            let client = Arc::clone(&self.client);
            let parser = Arc::clone(&self.parser);
            let url = url.clone();
            let timeout = self.timeout;
            let archive = self.spec.archive_raw;
            async move {
                let resp = client
                    .fetch(FetchRequest {
                        url,
                        headers: HashMap::new(),
                        timeout,
                    })
                    .await?
                    .into_success()?;
                let payload = parser.parse(&resp.body)?;
                let raw = archive.then_some(resp.body);
                Ok((payload, raw))
            }
        })
        .await
    }
}
