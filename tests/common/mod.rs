//! Fake UCI engines for integration tests.
//!
//! Each engine is a small shell script speaking enough UCI for the pool:
//! handshake, MultiPV, `go` with optional `searchmoves`, and `quit`. Output
//! is the same canned set of lines for any position. Every process of one
//! engine shares its temp directory for markers and the request log.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use position_analysis::EngineConfig;
use tempfile::TempDir;

pub const FAKE_ENGINE_NAME: &str = "FakeFish 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeMode {
    /// Answers every search
    Normal,
    /// Completes the handshake, then never answers `go`
    Hang,
    /// Exits on the first `go` it ever receives, then behaves normally
    CrashOnce,
    /// Never answers the first two `go`s across all processes, then answers
    HangTwice,
    /// Logs `begin`/`end` around a short sleep before answering
    Slow,
}

impl FakeMode {
    fn as_str(&self) -> &'static str {
        match self {
            FakeMode::Normal => "normal",
            FakeMode::Hang => "hang",
            FakeMode::CrashOnce => "crash_once",
            FakeMode::HangTwice => "hang_twice",
            FakeMode::Slow => "slow",
        }
    }
}

const SCRIPT: &str = r#"#!/bin/sh
MODE="__MODE__"
DIR="__DIR__"
multipv=1
while IFS= read -r line; do
  case "$line" in
    uci)
      echo "id name __NAME__"
      echo "uciok" ;;
    isready)
      echo "readyok" ;;
    "setoption name MultiPV value "*)
      multipv=${line##* } ;;
    go*)
      if [ "$MODE" = "hang" ]; then continue; fi
      if [ "$MODE" = "crash_once" ] && [ ! -f "$DIR/crashed" ]; then
        touch "$DIR/crashed"
        exit 1
      fi
      if [ "$MODE" = "hang_twice" ]; then
        if [ ! -f "$DIR/hung1" ]; then touch "$DIR/hung1"; continue; fi
        if [ ! -f "$DIR/hung2" ]; then touch "$DIR/hung2"; continue; fi
      fi
      if [ "$MODE" = "slow" ]; then
        echo begin >> "$DIR/engine.log"
        sleep 0.2
        echo end >> "$DIR/engine.log"
      fi
      case "$line" in
        *searchmoves*)
          mv=${line##* }
          echo "info depth 10 seldepth 12 multipv 1 score cp -15 nodes 500 pv $mv"
          echo "bestmove $mv" ;;
        *)
          i=0
          for entry in "35 e2e4 e7e5" "30 d2d4 d7d5" "22 g1f3 g8f6" "18 c2c4 e7e5"; do
            i=$((i + 1))
            [ "$i" -gt "$multipv" ] && break
            set -- $entry
            cp=$1
            shift
            echo "info depth 10 seldepth 14 multipv $i score cp $cp nodes 1000 pv $*"
          done
          echo "bestmove e2e4 ponder e7e5" ;;
      esac ;;
    quit)
      echo quit >> "$DIR/engine.log"
      exit 0 ;;
  esac
done
"#;

/// A fake engine binary living in its own temp directory.
pub struct FakeEngine {
    dir: TempDir,
    path: PathBuf,
}

impl FakeEngine {
    pub fn new(mode: FakeMode) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("fake-engine.sh");
        let script = SCRIPT
            .replace("__MODE__", mode.as_str())
            .replace("__DIR__", &dir.path().display().to_string())
            .replace("__NAME__", FAKE_ENGINE_NAME);

        fs::write(&path, script).expect("write fake engine");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake engine");
        Self { dir, path }
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            request_timeout: Duration::from_millis(2_000),
            handshake_timeout: Duration::from_millis(2_000),
            ..EngineConfig::with_path(&self.path)
        }
    }

    pub fn crashed(&self) -> bool {
        self.dir.path().join("crashed").exists()
    }

    /// Lines appended to the shared log by every process of this engine.
    pub fn log(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("engine.log"))
            .map(|text| text.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
