//! Deterministic evaluator answering from canned engine output.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::cache::normalize_fen;
use crate::engine::{DepthOrTimeLimit, EvaluationSource, Evaluator, SearchOutcome, SearchRequest};
use crate::error::EngineError;
use crate::variation::parse_search;

#[derive(Debug, Clone)]
enum Script {
    Output(Vec<String>),
    /// First attempt times out, the retry at reduced bound answers
    OutputAfterTimeout(Vec<String>),
    Timeout,
    Unavailable,
}

/// Answers requests from scripted UCI output keyed by position and
/// `searchmoves` restriction. Unscripted requests fail as unanalyzable.
#[derive(Debug)]
pub struct ScriptedEvaluator {
    identity: String,
    scripts: HashMap<(String, Option<String>), Script>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedEvaluator {
    pub fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            scripts: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn key(fen: &str, search_move: Option<&str>) -> (String, Option<String>) {
        (normalize_fen(fen), search_move.map(str::to_string))
    }

    /// Output for an unrestricted multi-PV search of `fen`.
    pub fn with_lines<S: AsRef<str>>(mut self, fen: &str, lines: &[S]) -> Self {
        let lines = lines.iter().map(|l| l.as_ref().to_string()).collect();
        self.scripts.insert(Self::key(fen, None), Script::Output(lines));
        self
    }

    /// Output for a search restricted to `uci`.
    pub fn with_single_move<S: AsRef<str>>(mut self, fen: &str, uci: &str, lines: &[S]) -> Self {
        let lines = lines.iter().map(|l| l.as_ref().to_string()).collect();
        self.scripts
            .insert(Self::key(fen, Some(uci)), Script::Output(lines));
        self
    }

    /// Like [`with_lines`](Self::with_lines), but answered only by the
    /// retry, so the outcome reports the reduced bound.
    pub fn with_lines_after_timeout<S: AsRef<str>>(mut self, fen: &str, lines: &[S]) -> Self {
        let lines = lines.iter().map(|l| l.as_ref().to_string()).collect();
        self.scripts
            .insert(Self::key(fen, None), Script::OutputAfterTimeout(lines));
        self
    }

    /// Make the search restricted to `uci` (or the full search when `None`) time out.
    pub fn with_timeout(mut self, fen: &str, uci: Option<&str>) -> Self {
        self.scripts.insert(Self::key(fen, uci), Script::Timeout);
        self
    }

    pub fn with_unavailable(mut self, fen: &str) -> Self {
        self.scripts.insert(Self::key(fen, None), Script::Unavailable);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn answer(
        request: &SearchRequest,
        lines: &[String],
        limit_used: DepthOrTimeLimit,
    ) -> SearchOutcome {
        let mut parsed = parse_search(lines);
        parsed.variations.truncate(request.multipv.max(1) as usize);
        SearchOutcome {
            variations: parsed.variations,
            best_move: parsed.best_move,
            source: EvaluationSource::Live,
            incomplete: parsed.parse_failures > 0,
            limit_used,
        }
    }

    fn record(&self, request: &SearchRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
    }
}

impl Evaluator for ScriptedEvaluator {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn evaluate(&self, request: &SearchRequest) -> Result<SearchOutcome, EngineError> {
        self.record(request);
        let key = Self::key(&request.fen, request.search_move.as_deref());

        match self.scripts.get(&key) {
            Some(Script::Output(lines)) => Ok(Self::answer(request, lines, request.limit)),
            Some(Script::OutputAfterTimeout(lines)) => {
                Ok(Self::answer(request, lines, request.limit.reduced()))
            }
            Some(Script::Timeout) => Err(EngineError::Unanalyzable {
                fen: request.fen.clone(),
                reason: EngineError::Timeout(0).to_string(),
            }),
            Some(Script::Unavailable) => {
                Err(EngineError::EngineUnavailable("scripted outage".into()))
            }
            None => Err(EngineError::Unanalyzable {
                fen: request.fen.clone(),
                reason: "no scripted output".into(),
            }),
        }
    }
}
