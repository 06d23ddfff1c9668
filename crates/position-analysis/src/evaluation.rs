//! Engine score representation.
//!
//! Scores are relative to the side to move, as UCI engines report them.
//! Mate scores are kept apart from centipawns; the only number derived from a
//! mate is [`Evaluation::sort_key`], which must be used for ordering only.

use std::cmp::Ordering;
use std::fmt;

use chess::Color;
use serde::{Deserialize, Serialize};

/// Base of the mate sentinel range used by [`Evaluation::sort_key`].
pub const MATE_SCORE: i32 = 100_000;

/// Centipawn scores are clamped to this magnitude, well inside the mate range.
pub const CENTIPAWN_LIMIT: i32 = MATE_SCORE / 2;

/// Longest mate distance that still gets its own sort key.
const MAX_MATE_PLIES: i32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Evaluation {
    /// Centipawns, positive favours the side to move.
    Centipawns(i32),
    /// Plies (engine "mate N") to mate; positive means the side to move mates.
    Mate(i32),
}

impl Evaluation {
    /// Build from the `cp` / `mate` tokens of an info line. Mate wins if both are present.
    pub fn from_uci_score(cp: Option<i32>, mate: Option<i32>) -> Option<Self> {
        match (cp, mate) {
            (_, Some(m)) => Some(Evaluation::Mate(m.clamp(-MAX_MATE_PLIES, MAX_MATE_PLIES))),
            (Some(c), None) => Some(Evaluation::Centipawns(c.clamp(-CENTIPAWN_LIMIT, CENTIPAWN_LIMIT))),
            (None, None) => None,
        }
    }

    /// Ordering key: centipawns as-is, mates mapped far outside any real score.
    pub fn sort_key(&self) -> i32 {
        match *self {
            Evaluation::Centipawns(cp) => cp.clamp(-CENTIPAWN_LIMIT, CENTIPAWN_LIMIT),
            Evaluation::Mate(n) if n > 0 => MATE_SCORE - n.min(MAX_MATE_PLIES),
            Evaluation::Mate(n) => -MATE_SCORE - n.max(-MAX_MATE_PLIES),
        }
    }

    pub fn is_mate(&self) -> bool {
        matches!(self, Evaluation::Mate(_))
    }

    pub fn mate_in(&self) -> Option<i32> {
        match *self {
            Evaluation::Mate(n) => Some(n),
            Evaluation::Centipawns(_) => None,
        }
    }

    pub fn centipawns(&self) -> Option<i32> {
        match *self {
            Evaluation::Centipawns(cp) => Some(cp),
            Evaluation::Mate(_) => None,
        }
    }

    /// The same score seen from the other side.
    pub fn negate(self) -> Self {
        match self {
            Evaluation::Centipawns(cp) => Evaluation::Centipawns(cp.saturating_neg()),
            Evaluation::Mate(n) => Evaluation::Mate(n.saturating_neg()),
        }
    }

    /// Re-express a score held from `pov`'s perspective as seen by `target`.
    pub fn relative_to(self, pov: Color, target: Color) -> Self {
        if pov == target {
            self
        } else {
            self.negate()
        }
    }
}

impl Ord for Evaluation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Evaluation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Evaluation::Centipawns(cp) => write!(f, "{:+.2}", cp as f64 / 100.0),
            Evaluation::Mate(n) if n > 0 => write!(f, "#{n}"),
            Evaluation::Mate(n) => write!(f, "#-{}", n.unsigned_abs()),
        }
    }
}
