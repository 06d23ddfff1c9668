//! UCI engine process wrapper (async I/O)

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::engine::DepthOrTimeLimit;
use crate::error::EngineError;
use crate::variation::{LineKind, ParsedSearch, VariationParser};

/// One engine process, used by a single request at a time.
pub struct UciEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    identity: String,
    multipv: u32,
    /// Set while a search is in flight; a handle dropped in this state
    /// has unread output pending and must not be reused.
    mid_request: bool,
}

impl UciEngine {
    /// Spawn the engine and complete the UCI handshake within the configured bound.
    pub async fn spawn(config: &EngineConfig) -> Result<Self, EngineError> {
        let mut process = Command::new(&config.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EngineError::EngineUnavailable(format!(
                    "failed to spawn {}: {e}",
                    config.path.display()
                ))
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::EngineUnavailable("engine stdin not captured".into()))?;
        let stdout = process
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| EngineError::EngineUnavailable("engine stdout not captured".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout,
            identity: String::new(),
            multipv: 1,
            mid_request: false,
        };

        match tokio::time::timeout(config.handshake_timeout, engine.handshake(config)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(EngineError::EngineUnavailable(format!("handshake failed: {e}"))),
            Err(_) => {
                return Err(EngineError::EngineUnavailable(format!(
                    "no uciok/readyok within {} ms",
                    config.handshake_timeout.as_millis()
                )))
            }
        }

        info!(identity = %engine.identity, path = %config.path.display(), "Engine ready");
        Ok(engine)
    }

    async fn handshake(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        self.send("uci").await?;
        loop {
            let line = self.read_line().await?;
            if let Some(name) = line.strip_prefix("id name ") {
                self.identity = name.trim().to_string();
            } else if line == "uciok" {
                break;
            }
        }
        if self.identity.is_empty() {
            self.identity = "unknown engine".to_string();
        }

        self.send(&format!("setoption name Threads value {}", config.threads))
            .await?;
        self.send(&format!("setoption name Hash value {}", config.hash_mb))
            .await?;
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    /// Engine name as reported by `id name`.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// False if a search was abandoned before its `bestmove`.
    pub fn is_clean(&self) -> bool {
        !self.mid_request
    }

    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(cmd, "UCI <");
        self.stdin.write_all(format!("{cmd}\n").as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        let read = self.stdout.read_line(&mut line).await?;
        if read == 0 {
            let status = self
                .process
                .try_wait()
                .ok()
                .flatten()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "stdout closed".to_string());
            return Err(EngineError::ProcessExited(status));
        }
        let trimmed = line.trim().to_string();
        debug!(line = %trimmed, "UCI >");
        Ok(trimmed)
    }

    async fn wait_for(&mut self, expected: &str) -> Result<(), EngineError> {
        loop {
            if self.read_line().await? == expected {
                return Ok(());
            }
        }
    }

    /// Run one search and collect its variations up to the `bestmove` line.
    pub async fn search(
        &mut self,
        fen: &str,
        multipv: u32,
        limit: DepthOrTimeLimit,
        search_move: Option<&str>,
    ) -> Result<ParsedSearch, EngineError> {
        self.mid_request = true;

        if multipv != self.multipv {
            self.send(&format!("setoption name MultiPV value {multipv}"))
                .await?;
            self.multipv = multipv;
        }
        self.send(&format!("position fen {fen}")).await?;
        let go = match search_move {
            Some(mv) => format!("{} searchmoves {mv}", limit.go_command()),
            None => limit.go_command(),
        };
        self.send(&go).await?;

        let mut parser = VariationParser::new();
        loop {
            let line = self.read_line().await?;
            if parser.feed(&line) == LineKind::BestMove {
                break;
            }
        }

        self.mid_request = false;
        Ok(parser.finish())
    }

    /// Ask the engine to exit and wait up to `grace` for it. A process still
    /// running after that is killed on drop.
    pub async fn quit(mut self, grace: Duration) {
        if self.send("quit").await.is_err() {
            return;
        }
        match tokio::time::timeout(grace, self.process.wait()).await {
            Ok(Ok(status)) => debug!(identity = %self.identity, %status, "Engine exited"),
            Ok(Err(e)) => debug!(identity = %self.identity, error = %e, "Engine wait failed"),
            Err(_) => debug!(identity = %self.identity, "Engine ignored quit"),
        }
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.process.start_kill();
    }
}
