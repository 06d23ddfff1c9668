/// Attack-based detectors: fork, hanging pieces

use chess::{BitBoard, Board, Color, Piece, Square, EMPTY};
use serde::{Deserialize, Serialize};

use crate::board_utils::{
    attackers, attacks, color_name, is_defended, is_en_prise, king_value, piece_name, piece_value,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HangingPiece {
    pub square: String,
    pub piece: String,
    pub color: String,
    pub value: i32,
    /// Value of the cheapest attacker
    pub attacker_value: i32,
    pub defended: bool,
}

/// Pieces of either color that are attacked and either undefended or
/// attackable by something cheaper.
pub fn hanging_pieces(board: &Board) -> Vec<HangingPiece> {
    let mut result = Vec::new();
    for sq in *board.combined() {
        if !is_en_prise(board, sq) {
            continue;
        }
        let (piece, color) = match (board.piece_on(sq), board.color_on(sq)) {
            (Some(p), Some(c)) => (p, c),
            _ => continue,
        };
        let attacker_value = attackers(board, !color, sq)
            .into_iter()
            .filter_map(|a| board.piece_on(a))
            .map(king_value)
            .min()
            .unwrap_or(0);

        result.push(HangingPiece {
            square: sq.to_string(),
            piece: piece_name(piece).to_string(),
            color: color_name(color).to_string(),
            value: piece_value(piece),
            attacker_value,
            defended: is_defended(board, color, sq),
        });
    }
    result
}

fn en_prise_squares(board: &Board, color: Color) -> BitBoard {
    let mut result = EMPTY;
    for sq in *board.color_combined(color) {
        if is_en_prise(board, sq) {
            result |= BitBoard::from_square(sq);
        }
    }
    result
}

/// The move leaves an opponent piece en prise that was not before.
pub fn creates_hanging_piece(before: &Board, after: &Board, mover: Color) -> bool {
    let fresh = en_prise_squares(after, !mover) & !en_prise_squares(before, !mover);
    fresh != EMPTY
}

/// Fork: the moved piece, standing safely, hits two or more targets that are
/// worth more than it or are undefended.
pub fn fork(after: &Board, dest: Square, mover: Color) -> bool {
    let moved = match after.piece_on(dest) {
        Some(Piece::King) | None => return false,
        Some(p) => p,
    };
    if is_en_prise(after, dest) {
        return false;
    }

    let targets = attacks(after, dest) & *after.color_combined(!mover);
    let forked = targets
        .into_iter()
        .filter(|&sq| match after.piece_on(sq) {
            Some(Piece::Pawn) | None => false,
            Some(target) => {
                king_value(target) > king_value(moved) || !is_defended(after, !mover, sq)
            }
        })
        .count();
    forked > 1
}
