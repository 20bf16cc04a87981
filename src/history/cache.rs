//! Persisted edit history.
//!
//! A cache is keyed by the model source plus its training hyperparameters, so a
//! retrained model with different settings never picks up stale edits.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::KnotSet;
use crate::error::AppError;
use crate::history::ledger::HistoryEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCache {
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub history_cursor: usize,
    #[serde(default)]
    pub active_partial_idx: usize,
    /// Per-feature replay origins that no longer match the baseline, i.e.
    /// curves that already absorbed entries evicted by the history limit.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replay_origins: BTreeMap<String, KnotSet>,
}

/// Hex digits kept from the blake3 digest.
const KEY_LEN: usize = 16;

/// Stable hex key for a model source and its hyperparameters.
///
/// `serde_json::Map` keeps keys sorted, so insertion order does not matter.
pub fn cache_key(source: &str, hyperparams: &Map<String, Value>) -> String {
    let canonical = format!("{source}\u{0}{}", Value::Object(hyperparams.clone()));
    let digest = blake3::hash(canonical.as_bytes()).to_hex();
    digest.as_str()[..KEY_LEN].to_string()
}

pub fn encode(cache: &HistoryCache) -> Result<String, AppError> {
    serde_json::to_string(cache).map_err(|e| AppError::new(4, format!("Failed to encode history cache: {e}")))
}

/// Parse a cached history. Anything malformed is dropped wholesale.
pub fn decode(text: &str) -> Option<HistoryCache> {
    let mut cache: HistoryCache = match serde_json::from_str(text) {
        Ok(cache) => cache,
        Err(e) => {
            warn!("Ignoring malformed history cache: {e}");
            return None;
        }
    };
    for entry in &mut cache.history {
        for change in &mut entry.changes {
            change.backfill_delta();
        }
    }
    cache.history_cursor = cache.history_cursor.min(cache.history.len());
    Some(cache)
}

/// One JSON file per cache key under a directory.
#[derive(Debug, Clone)]
pub struct HistoryCacheStore {
    dir: PathBuf,
}

impl HistoryCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Missing and unreadable caches both come back as `None`.
    pub fn load(&self, key: &str) -> Option<HistoryCache> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(text) => decode(&text),
            Err(e) => {
                warn!("Failed to read history cache '{}': {e}", path.display());
                None
            }
        }
    }

    pub fn save(&self, key: &str, cache: &HistoryCache) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::new(2, format!("Failed to create history cache dir '{}': {e}", self.dir.display()))
        })?;
        let path = self.path_for(key);
        fs::write(&path, encode(cache)?)
            .map_err(|e| AppError::new(2, format!("Failed to write history cache '{}': {e}", path.display())))?;
        debug!("history cache: saved {} entries to {}", cache.history.len(), path.display());
        Ok(path)
    }
}
