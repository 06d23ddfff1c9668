//! Analysis error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine process could not be started or failed its handshake.
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Engine timed out after {0} ms")]
    Timeout(u64),

    #[error("Engine process exited: {0}")]
    ProcessExited(String),

    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Retries are exhausted for this position.
    #[error("Position unanalyzable ({fen}): {reason}")]
    Unanalyzable { fen: String, reason: String },

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Engine pool is shut down")]
    PoolClosed,
}

impl EngineError {
    /// Failures that leave the handle in an unknown protocol state and are
    /// worth a single retry on a fresh process.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Timeout(_) | EngineError::ProcessExited(_) | EngineError::Io(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Invalid move {mv}: {reason}")]
    InvalidMove { mv: String, reason: String },

    #[error("multipv_count must be at least 1")]
    InvalidMultiPv,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
