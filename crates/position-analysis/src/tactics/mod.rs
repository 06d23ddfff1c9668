/// Tactical motif detection for a single move.
/// Presence flags only; nothing here is scored.

pub mod attacks;
pub mod line_geometry;

use std::collections::BTreeSet;
use std::fmt;

use chess::{Board, ChessMove, Piece};
use serde::{Deserialize, Serialize};

pub use attacks::{hanging_pieces, HangingPiece};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TacticalMotif {
    Fork,
    Pin,
    Skewer,
    DiscoveredAttack,
    Check,
    Capture,
    Promotion,
    HangingPiece,
}

impl TacticalMotif {
    pub fn as_str(&self) -> &'static str {
        match self {
            TacticalMotif::Fork => "fork",
            TacticalMotif::Pin => "pin",
            TacticalMotif::Skewer => "skewer",
            TacticalMotif::DiscoveredAttack => "discovered_attack",
            TacticalMotif::Check => "check",
            TacticalMotif::Capture => "capture",
            TacticalMotif::Promotion => "promotion",
            TacticalMotif::HangingPiece => "hanging_piece",
        }
    }
}

impl fmt::Display for TacticalMotif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_capture(before: &Board, mv: ChessMove) -> bool {
    if before.piece_on(mv.get_dest()).is_some() {
        return true;
    }
    // En passant: a pawn changing file onto an empty square
    before.piece_on(mv.get_source()) == Some(Piece::Pawn)
        && mv.get_source().get_file() != mv.get_dest().get_file()
}

/// Motifs created by playing the legal move `mv` from `before`.
pub fn detect(before: &Board, mv: ChessMove) -> BTreeSet<TacticalMotif> {
    let after = before.make_move_new(mv);
    let mover = before.side_to_move();
    let mut motifs = BTreeSet::new();

    if after.checkers().popcnt() > 0 {
        motifs.insert(TacticalMotif::Check);
    }
    if is_capture(before, mv) {
        motifs.insert(TacticalMotif::Capture);
    }
    if mv.get_promotion().is_some() {
        motifs.insert(TacticalMotif::Promotion);
    }
    if attacks::fork(&after, mv.get_dest(), mover) {
        motifs.insert(TacticalMotif::Fork);
    }
    if line_geometry::pin(&after, mv.get_dest(), mover) {
        motifs.insert(TacticalMotif::Pin);
    }
    if line_geometry::skewer(&after, mv.get_dest(), mover) {
        motifs.insert(TacticalMotif::Skewer);
    }
    if line_geometry::discovered_attack(&after, mv, mover) {
        motifs.insert(TacticalMotif::DiscoveredAttack);
    }
    if attacks::creates_hanging_piece(before, &after, mover) {
        motifs.insert(TacticalMotif::HangingPiece);
    }

    motifs
}
