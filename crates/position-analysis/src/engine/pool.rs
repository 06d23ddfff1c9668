//! Bounded pool of engine processes with exclusive checkout.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::engine::session::UciEngine;
use crate::engine::DepthOrTimeLimit;
use crate::error::EngineError;
use crate::variation::ParsedSearch;

pub struct EnginePool {
    config: EngineConfig,
    identity: String,
    idle: Mutex<Vec<UciEngine>>,
    permits: Semaphore,
}

impl EnginePool {
    /// Start the pool with one engine spawned eagerly. Failure here is fatal:
    /// a missing or broken binary is reported before any request is taken.
    pub async fn start(config: EngineConfig) -> Result<Self, EngineError> {
        let size = config.pool_size.max(1);
        let first = UciEngine::spawn(&config).await?;
        let identity = first.identity().to_string();
        info!(identity = %identity, size, "Engine pool started");

        Ok(Self {
            config,
            identity,
            idle: Mutex::new(vec![first]),
            permits: Semaphore::new(size),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn idle_count(&self) -> usize {
        self.lock_idle().len()
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<UciEngine>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait for a free slot and hand out an engine, spawning a replacement
    /// when no idle process is available.
    pub async fn checkout(&self) -> Result<EngineLease<'_>, EngineError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| EngineError::PoolClosed)?;

        let idle = self.lock_idle().pop();
        let engine = match idle {
            Some(engine) => engine,
            None => {
                info!("Spawning engine process");
                UciEngine::spawn(&self.config).await?
            }
        };

        Ok(EngineLease {
            pool: self,
            engine: Some(engine),
            _permit: permit,
        })
    }

    /// Refuse further checkouts and send `quit` to idle processes. Leased
    /// engines are killed when their lease drops.
    pub async fn shutdown(&self) {
        self.permits.close();
        let drained: Vec<UciEngine> = self.lock_idle().drain(..).collect();
        let count = drained.len();
        for engine in drained {
            engine.quit(self.config.handshake_timeout).await;
        }
        info!(stopped = count, "Engine pool shut down");
    }

    fn release(&self, engine: UciEngine) {
        if self.is_closed() {
            return;
        }
        if !engine.is_clean() {
            warn!("Discarding engine abandoned mid-request");
            return;
        }
        self.lock_idle().push(engine);
    }
}

/// Exclusive use of one engine. Dropping the lease returns the engine to the
/// pool, or kills it if a search was abandoned part-way.
pub struct EngineLease<'a> {
    pool: &'a EnginePool,
    engine: Option<UciEngine>,
    _permit: SemaphorePermit<'a>,
}

impl EngineLease<'_> {
    pub async fn search(
        &mut self,
        fen: &str,
        multipv: u32,
        limit: DepthOrTimeLimit,
        search_move: Option<&str>,
    ) -> Result<ParsedSearch, EngineError> {
        match self.engine.as_mut() {
            Some(engine) => engine.search(fen, multipv, limit, search_move).await,
            None => Err(EngineError::PoolClosed),
        }
    }
}

impl Drop for EngineLease<'_> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.pool.release(engine);
        }
    }
}
