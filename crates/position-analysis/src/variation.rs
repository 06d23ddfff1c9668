//! Variation parser: turns raw UCI engine output into ranked [`Variation`]s.
//!
//! Info lines are tolerated in any order and may repeat; per multi-PV slot the
//! deepest line wins. Unknown lines are skipped. The final list is re-sorted so
//! ranks are dense (1..K) and scores never increase with rank.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::evaluation::Evaluation;

/// One principal variation reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    /// 1 = best.
    pub rank: u32,
    pub score: Evaluation,
    pub moves: Vec<String>,
    pub depth: u32,
    pub nodes: u64,
}

impl Variation {
    pub fn first_move(&self) -> Option<&str> {
        self.moves.first().map(String::as_str)
    }

    pub fn is_mate(&self) -> bool {
        self.score.is_mate()
    }

    pub fn mate_in(&self) -> Option<i32> {
        self.score.mate_in()
    }
}

/// Result of parsing one search.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedSearch {
    pub variations: Vec<Variation>,
    pub best_move: Option<String>,
    /// Lines that looked like scored output but could not be parsed.
    pub parse_failures: u32,
}

/// What a single output line turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Info,
    BestMove,
    Skipped,
    Malformed,
}

/// Fields pulled from an info line before validation.
#[derive(Debug, Default)]
struct InfoFields {
    depth: Option<u32>,
    multipv: Option<u32>,
    cp: Option<i32>,
    mate: Option<i32>,
    nodes: u64,
    bound: bool,
    has_score: bool,
    pv: Vec<String>,
    malformed: bool,
}

/// Tokens that end a PV (some engines append fields after it).
const PV_TERMINATORS: &[&str] = &["string", "bmc", "refutation", "currline"];

fn scan_info(line: &str) -> InfoFields {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut fields = InfoFields::default();

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                fields.depth = parts.get(i + 1).and_then(|v| v.parse().ok());
                fields.malformed |= fields.depth.is_none();
                i += 1;
            }
            "multipv" => {
                fields.multipv = parts.get(i + 1).and_then(|v| v.parse().ok());
                fields.malformed |= fields.multipv.is_none();
                i += 1;
            }
            "nodes" => {
                fields.nodes = parts.get(i + 1).and_then(|v| v.parse().ok()).unwrap_or(0);
                i += 1;
            }
            "score" => {
                fields.has_score = true;
                match parts.get(i + 1).copied() {
                    Some("cp") => {
                        fields.cp = parts.get(i + 2).and_then(|v| v.parse().ok());
                        fields.malformed |= fields.cp.is_none();
                    }
                    Some("mate") => {
                        fields.mate = parts.get(i + 2).and_then(|v| v.parse().ok());
                        fields.malformed |= fields.mate.is_none();
                    }
                    _ => fields.malformed = true,
                }
                i += 2;
            }
            "lowerbound" | "upperbound" => fields.bound = true,
            "pv" => {
                fields.pv = parts[i + 1..]
                    .iter()
                    .take_while(|t| !PV_TERMINATORS.contains(t))
                    .map(|t| t.to_string())
                    .collect();
                break;
            }
            "string" => break,
            _ => {}
        }
        i += 1;
    }

    fields
}

/// Incremental parser fed one engine line at a time.
#[derive(Debug, Default)]
pub struct VariationParser {
    slots: BTreeMap<u32, Variation>,
    best_move: Option<String>,
    parse_failures: u32,
}

impl VariationParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, line: &str) -> LineKind {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("bestmove") {
            self.best_move = rest
                .split_whitespace()
                .next()
                .filter(|m| *m != "(none)" && *m != "0000")
                .map(str::to_string);
            return LineKind::BestMove;
        }

        if !line.starts_with("info ") {
            return LineKind::Skipped;
        }

        let fields = scan_info(line);
        if !fields.has_score && fields.pv.is_empty() && !fields.malformed {
            return LineKind::Skipped;
        }
        if fields.bound {
            return LineKind::Skipped;
        }

        let score = Evaluation::from_uci_score(fields.cp, fields.mate);
        let (depth, score) = match (fields.depth, score) {
            (Some(depth), Some(score)) if !fields.malformed && !fields.pv.is_empty() => {
                (depth, score)
            }
            _ => {
                self.parse_failures += 1;
                warn!(line, "Dropping malformed engine info line");
                return LineKind::Malformed;
            }
        };

        let slot = fields.multipv.unwrap_or(1);
        let candidate = Variation {
            rank: slot,
            score,
            moves: fields.pv,
            depth,
            nodes: fields.nodes,
        };

        match self.slots.get(&slot) {
            Some(existing) if existing.depth > candidate.depth => {}
            _ => {
                self.slots.insert(slot, candidate);
            }
        }
        LineKind::Info
    }

    pub fn best_move(&self) -> Option<&str> {
        self.best_move.as_deref()
    }

    pub fn finish(self) -> ParsedSearch {
        let mut variations: Vec<Variation> = self.slots.into_values().collect();
        rank_variations(&mut variations);
        ParsedSearch {
            variations,
            best_move: self.best_move,
            parse_failures: self.parse_failures,
        }
    }
}

/// Sort best-first and assign dense ranks.
///
/// Ties on score go to the shorter PV, then to the lexically smaller first move.
pub fn rank_variations(variations: &mut [Variation]) {
    variations.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.moves.len().cmp(&b.moves.len()))
            .then_with(|| a.moves.cmp(&b.moves))
    });
    for (i, v) in variations.iter_mut().enumerate() {
        v.rank = i as u32 + 1;
    }
}

/// Parse a complete block of engine output.
pub fn parse<S: AsRef<str>>(lines: &[S]) -> Vec<Variation> {
    parse_search(lines).variations
}

pub fn parse_search<S: AsRef<str>>(lines: &[S]) -> ParsedSearch {
    let mut parser = VariationParser::new();
    for line in lines {
        parser.feed(line.as_ref());
    }
    parser.finish()
}
