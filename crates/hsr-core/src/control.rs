//! Run control for cancelling season downloads: shared abort tokens.
//!
//! When a season runs with a `RunControl`, each (source, season) pass is
//! registered with an abort token. A control caller (e.g. ctrl-c handling in
//! the CLI) can request abort; the engine checks the token between item
//! spawns and stops enumerating. Items not yet started stay pending;
//! in-flight items finish their current attempt and record their outcome.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::progress::{SeasonId, SourceKind};

/// Shared registry of (source, season) -> abort token.
#[derive(Default)]
pub struct RunControl {
    runs: RwLock<HashMap<(SourceKind, SeasonId), Arc<AtomicBool>>>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running season pass; returns the abort token to pass to
    /// the engine. The token is set to true when abort is requested.
    pub fn register(&self, source: SourceKind, season: SeasonId) -> Arc<AtomicBool> {
        let token = Arc::new(AtomicBool::new(false));
        self.runs
            .write()
            .unwrap()
            .insert((source, season), Arc::clone(&token));
        token
    }

    /// Unregister a pass (call when it finishes, success or failure).
    pub fn unregister(&self, source: SourceKind, season: SeasonId) {
        self.runs.write().unwrap().remove(&(source, season));
    }

    /// Request abort for one source's season pass.
    pub fn request_abort(&self, source: SourceKind, season: SeasonId) {
        if let Some(token) = self.runs.read().unwrap().get(&(source, season)) {
            token.store(true, Ordering::Relaxed);
        }
    }

    /// Request abort for every registered pass.
    pub fn request_abort_all(&self) {
        for token in self.runs.read().unwrap().values() {
            token.store(true, Ordering::Relaxed);
        }
    }
}
