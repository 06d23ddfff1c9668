//! Engine session management: the [`Evaluator`] capability, the UCI-backed
//! implementation with caching and retry, and a scripted fake for tests.

pub mod pool;
pub mod scripted;
pub mod session;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chess::MoveGen;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{AnalysisCache, CacheKey, CachedResult};
use crate::error::EngineError;
use crate::position::validate_fen;
use crate::variation::{ParsedSearch, Variation};

pub use pool::{EngineLease, EnginePool};
pub use scripted::ScriptedEvaluator;
pub use session::UciEngine;

/// Search bound sent with `go`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthOrTimeLimit {
    Depth(u32),
    MoveTimeMs(u64),
}

impl DepthOrTimeLimit {
    pub fn go_command(&self) -> String {
        match self {
            DepthOrTimeLimit::Depth(d) => format!("go depth {d}"),
            DepthOrTimeLimit::MoveTimeMs(ms) => format!("go movetime {ms}"),
        }
    }

    /// The bound used for the single retry after a timeout.
    pub fn reduced(&self) -> Self {
        match *self {
            DepthOrTimeLimit::Depth(d) => DepthOrTimeLimit::Depth((d / 2).max(1)),
            DepthOrTimeLimit::MoveTimeMs(ms) => DepthOrTimeLimit::MoveTimeMs((ms / 2).max(10)),
        }
    }
}

impl fmt::Display for DepthOrTimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepthOrTimeLimit::Depth(d) => write!(f, "depth {d}"),
            DepthOrTimeLimit::MoveTimeMs(ms) => write!(f, "movetime {ms}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub fen: String,
    pub multipv: u32,
    pub limit: DepthOrTimeLimit,
    /// Restrict the search to one root move (UCI `searchmoves`).
    pub search_move: Option<String>,
}

impl SearchRequest {
    pub fn multipv(fen: &str, multipv: u32, limit: DepthOrTimeLimit) -> Self {
        Self {
            fen: fen.to_string(),
            multipv,
            limit,
            search_move: None,
        }
    }

    pub fn single_move(fen: &str, uci: &str, limit: DepthOrTimeLimit) -> Self {
        Self {
            fen: fen.to_string(),
            multipv: 1,
            limit,
            search_move: Some(uci.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationSource {
    Live,
    Cache,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub variations: Vec<Variation>,
    pub best_move: Option<String>,
    pub source: EvaluationSource,
    /// Fewer variations than requested, or some engine lines were dropped.
    pub incomplete: bool,
    /// The bound the result was actually searched with (reduced after a retry).
    pub limit_used: DepthOrTimeLimit,
}

/// Anything that can score a position: the UCI pool in production, a script in tests.
pub trait Evaluator: Send + Sync {
    /// Engine name and version, part of every cache key.
    fn identity(&self) -> &str;

    fn evaluate(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<SearchOutcome, EngineError>> + Send;
}

/// Evaluator backed by an [`EnginePool`], with an optional injected cache.
pub struct EngineEvaluator {
    pool: Arc<EnginePool>,
    cache: Option<Arc<dyn AnalysisCache>>,
    timeout: Duration,
}

impl EngineEvaluator {
    pub fn new(pool: Arc<EnginePool>) -> Self {
        let timeout = pool.config().request_timeout;
        Self {
            pool,
            cache: None,
            timeout,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn AnalysisCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pool(&self) -> &Arc<EnginePool> {
        &self.pool
    }

    pub fn cache_key(&self, request: &SearchRequest, limit: DepthOrTimeLimit) -> CacheKey {
        CacheKey::new(
            &request.fen,
            request.multipv,
            limit,
            self.pool.identity(),
            request.search_move.as_deref(),
        )
    }

    async fn search_once(
        &self,
        request: &SearchRequest,
        limit: DepthOrTimeLimit,
    ) -> Result<ParsedSearch, EngineError> {
        let mut lease = self.pool.checkout().await?;
        let search = lease.search(
            &request.fen,
            request.multipv,
            limit,
            request.search_move.as_deref(),
        );
        match tokio::time::timeout(self.timeout, search).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}

impl Evaluator for EngineEvaluator {
    fn identity(&self) -> &str {
        self.pool.identity()
    }

    async fn evaluate(&self, request: &SearchRequest) -> Result<SearchOutcome, EngineError> {
        let board =
            validate_fen(&request.fen).map_err(|e| EngineError::InvalidPosition(e.to_string()))?;
        let request = SearchRequest {
            multipv: request.multipv.max(1),
            ..request.clone()
        };

        let key = self.cache_key(&request, request.limit);
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            debug!(fen = %request.fen, "Engine cache hit");
            return Ok(SearchOutcome {
                variations: hit.variations,
                best_move: hit.best_move,
                source: EvaluationSource::Cache,
                incomplete: false,
                limit_used: request.limit,
            });
        }

        let (parsed, limit_used) = match self.search_once(&request, request.limit).await {
            Ok(parsed) => (parsed, request.limit),
            Err(e) if e.is_retryable() => {
                let reduced = request.limit.reduced();
                warn!(fen = %request.fen, error = %e, retry_limit = %reduced, "Engine request failed, retrying once");
                match self.search_once(&request, reduced).await {
                    Ok(parsed) => (parsed, reduced),
                    Err(e) if e.is_retryable() => {
                        warn!(fen = %request.fen, error = %e, "Engine retry failed, position unanalyzable");
                        return Err(EngineError::Unanalyzable {
                            fen: request.fen.clone(),
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        let legal_moves = MoveGen::new_legal(&board).len() as u32;
        let expected = if request.search_move.is_some() {
            1
        } else {
            request.multipv.min(legal_moves)
        };
        let incomplete = (parsed.variations.len() as u32) < expected || parsed.parse_failures > 0;
        if incomplete {
            warn!(
                fen = %request.fen,
                expected,
                received = parsed.variations.len(),
                parse_failures = parsed.parse_failures,
                "Engine returned partial results"
            );
        }

        if !incomplete {
            if let Some(cache) = &self.cache {
                cache.put(
                    self.cache_key(&request, limit_used),
                    CachedResult {
                        variations: parsed.variations.clone(),
                        best_move: parsed.best_move.clone(),
                    },
                );
            }
        }

        info!(
            fen = %request.fen,
            variations = parsed.variations.len(),
            limit = %limit_used,
            "Position evaluated"
        );

        Ok(SearchOutcome {
            variations: parsed.variations,
            best_move: parsed.best_move,
            source: EvaluationSource::Live,
            incomplete,
            limit_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_command() {
        assert_eq!(DepthOrTimeLimit::Depth(18).go_command(), "go depth 18");
        assert_eq!(DepthOrTimeLimit::MoveTimeMs(500).go_command(), "go movetime 500");
    }

    #[test]
    fn test_reduced_limits() {
        assert_eq!(DepthOrTimeLimit::Depth(18).reduced(), DepthOrTimeLimit::Depth(9));
        assert_eq!(DepthOrTimeLimit::Depth(1).reduced(), DepthOrTimeLimit::Depth(1));
        assert_eq!(
            DepthOrTimeLimit::MoveTimeMs(1000).reduced(),
            DepthOrTimeLimit::MoveTimeMs(500)
        );
        assert_eq!(
            DepthOrTimeLimit::MoveTimeMs(12).reduced(),
            DepthOrTimeLimit::MoveTimeMs(10)
        );
    }

    #[test]
    fn test_request_constructors() {
        let req = SearchRequest::single_move("fen", "e2e4", DepthOrTimeLimit::Depth(10));
        assert_eq!(req.multipv, 1);
        assert_eq!(req.search_move.as_deref(), Some("e2e4"));
        let req = SearchRequest::multipv("fen", 4, DepthOrTimeLimit::Depth(10));
        assert!(req.search_move.is_none());
    }
}
