//! Cache collaborator for engine results.
//!
//! The cache is owned by the host application; the core only builds keys and
//! calls `get`/`put`. A miss and an absent cache behave identically.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::engine::DepthOrTimeLimit;
use crate::variation::Variation;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub fen: String,
    pub multipv: u32,
    pub limit: DepthOrTimeLimit,
    pub engine_identity: String,
    /// Set for single-move searches restricted with `searchmoves`.
    pub restrict_to: Option<String>,
}

impl CacheKey {
    pub fn new(
        fen: &str,
        multipv: u32,
        limit: DepthOrTimeLimit,
        engine_identity: &str,
        restrict_to: Option<&str>,
    ) -> Self {
        Self {
            fen: normalize_fen(fen),
            multipv,
            limit,
            engine_identity: engine_identity.to_string(),
            restrict_to: restrict_to.map(str::to_string),
        }
    }

    /// Flat string form for stores that key by text.
    pub fn as_storage_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.fen,
            self.multipv,
            self.limit,
            self.engine_identity,
            self.restrict_to.as_deref().unwrap_or("*")
        )
    }
}

/// Collapses whitespace so equivalent FEN text hits the same entry.
pub fn normalize_fen(fen: &str) -> String {
    fen.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResult {
    pub variations: Vec<Variation>,
    pub best_move: Option<String>,
}

/// Thread-safe key/value store supplied by the host. Concurrent `put`s for
/// the same key may race; last write wins.
pub trait AnalysisCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CachedResult>;
    fn put(&self, key: CacheKey, result: CachedResult);
}

/// Process-local cache, mainly for tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<CacheKey, CachedResult>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnalysisCache for InMemoryCache {
    fn get(&self, key: &CacheKey) -> Option<CachedResult> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn put(&self, key: CacheKey, result: CachedResult) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, result);
        }
    }
}
