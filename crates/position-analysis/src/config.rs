//! Configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::classify::ClassificationBands;
use crate::engine::DepthOrTimeLimit;
use crate::error::AnalysisError;
use crate::metrics::MetricWeights;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Path to the UCI engine binary
    pub path: PathBuf,

    /// Maximum number of engine processes
    pub pool_size: usize,

    /// Bound on a single search request
    pub request_timeout: Duration,

    /// Bound on the `uci`/`isready` handshake
    pub handshake_timeout: Duration,

    pub threads: u32,
    pub hash_mb: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/usr/local/bin/stockfish"),
            pool_size: 1,
            request_timeout: Duration::from_millis(30_000),
            handshake_timeout: Duration::from_millis(10_000),
            threads: 1,
            hash_mb: 128,
        }
    }
}

impl EngineConfig {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let path = env::var("ENGINE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.path);

        let pool_size = env::var("ENGINE_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(defaults.pool_size);

        let request_timeout = env::var("ENGINE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_timeout);

        let handshake_timeout = env::var("ENGINE_HANDSHAKE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.handshake_timeout);

        let threads = env::var("ENGINE_THREADS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.threads);

        let hash_mb = env::var("ENGINE_HASH_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.hash_mb);

        Self {
            path,
            pool_size,
            request_timeout,
            handshake_timeout,
            threads,
            hash_mb,
        }
    }
}

/// Defaults applied by the CLI and by hosts that don't build requests by hand.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    pub engine: EngineConfig,
    pub multipv: u32,
    pub limit: DepthOrTimeLimit,
    pub bands: ClassificationBands,
    pub weights: MetricWeights,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            multipv: 3,
            limit: DepthOrTimeLimit::Depth(18),
            bands: ClassificationBands::default(),
            weights: MetricWeights::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_env() -> Result<Self, AnalysisError> {
        let defaults = Self::default();

        let multipv = match env::var("ANALYSIS_MULTIPV") {
            Ok(v) => v
                .parse()
                .ok()
                .filter(|n: &u32| *n > 0)
                .ok_or_else(|| AnalysisError::Config(format!("ANALYSIS_MULTIPV invalid: {v}")))?,
            Err(_) => defaults.multipv,
        };

        // A move time takes precedence over depth when both are set.
        let limit = match env::var("ANALYSIS_MOVETIME_MS").ok().and_then(|v| v.parse().ok()) {
            Some(ms) => DepthOrTimeLimit::MoveTimeMs(ms),
            None => env::var("ANALYSIS_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(DepthOrTimeLimit::Depth)
                .unwrap_or(defaults.limit),
        };

        let bands = match env::var("CLASSIFICATION_BANDS") {
            Ok(v) => v.parse::<ClassificationBands>()?,
            Err(_) => defaults.bands,
        };

        Ok(Self {
            engine: EngineConfig::from_env(),
            multipv,
            limit,
            bands,
            weights: defaults.weights,
        })
    }
}
