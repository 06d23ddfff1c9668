/// Line geometry detectors: pin, skewer, discovered attack

use chess::{BitBoard, Board, ChessMove, Color, File, Piece, Rank, Square, EMPTY};

use crate::board_utils::{attacks, is_ray_piece, king_value};

const ORTHOGONAL: &[(i32, i32)] = &[(0, 1), (0, -1), (1, 0), (-1, 0)];
const DIAGONAL: &[(i32, i32)] = &[(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ALL_LINES: &[(i32, i32)] = &[
    (0, 1),
    (0, -1),
    (1, 0),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

fn directions(piece: Piece) -> &'static [(i32, i32)] {
    match piece {
        Piece::Rook => ORTHOGONAL,
        Piece::Bishop => DIAGONAL,
        Piece::Queen => ALL_LINES,
        _ => &[],
    }
}

fn step(sq: Square, (df, dr): (i32, i32)) -> Option<Square> {
    let file = sq.get_file().to_index() as i32 + df;
    let rank = sq.get_rank().to_index() as i32 + dr;
    if (0..8).contains(&file) && (0..8).contains(&rank) {
        Some(Square::make_square(
            Rank::from_index(rank as usize),
            File::from_index(file as usize),
        ))
    } else {
        None
    }
}

/// First two occupied squares along a ray, skipping the origin.
fn first_two(board: &Board, from: Square, dir: (i32, i32)) -> (Option<Square>, Option<Square>) {
    let mut hits = Vec::with_capacity(2);
    let mut cur = from;
    while let Some(next) = step(cur, dir) {
        if board.piece_on(next).is_some() {
            hits.push(next);
            if hits.len() == 2 {
                break;
            }
        }
        cur = next;
    }
    (hits.first().copied(), hits.get(1).copied())
}

/// Enemy pieces lined up behind each other on the slider's rays: (front, back).
fn lined_up(after: &Board, dest: Square, mover: Color) -> Vec<(Piece, Piece)> {
    let slider = match after.piece_on(dest) {
        Some(p) if is_ray_piece(p) => p,
        _ => return Vec::new(),
    };
    let enemy = *after.color_combined(!mover);
    let is_enemy = |sq: Square| enemy & BitBoard::from_square(sq) != EMPTY;

    directions(slider)
        .iter()
        .filter_map(|&dir| match first_two(after, dest, dir) {
            (Some(front), Some(back)) if is_enemy(front) && is_enemy(back) => {
                Some((after.piece_on(front)?, after.piece_on(back)?))
            }
            _ => None,
        })
        .collect()
}

/// Pin: the moved slider hits an enemy piece shielding something more valuable.
pub fn pin(after: &Board, dest: Square, mover: Color) -> bool {
    lined_up(after, dest, mover)
        .into_iter()
        .any(|(front, back)| front != Piece::King && king_value(back) > king_value(front))
}

/// Skewer: the moved slider hits a valuable enemy piece with a lesser one behind it.
pub fn skewer(after: &Board, dest: Square, mover: Color) -> bool {
    lined_up(after, dest, mover).into_iter().any(|(front, back)| {
        back != Piece::Pawn && king_value(front) > king_value(back)
    })
}

/// Discovered attack: moving off a line lets another of our sliders reach
/// an enemy piece (pawns aside).
pub fn discovered_attack(after: &Board, mv: ChessMove, mover: Color) -> bool {
    let source = mv.get_source();
    let ours = *after.color_combined(mover);
    let sliders =
        (*after.pieces(Piece::Bishop) | *after.pieces(Piece::Rook) | *after.pieces(Piece::Queen))
            & ours
            & !BitBoard::from_square(mv.get_dest());

    for slider in sliders {
        let targets = attacks(after, slider) & *after.color_combined(!mover);
        for target in targets {
            if after.piece_on(target) == Some(Piece::Pawn) {
                continue;
            }
            if chess::between(slider, target) & BitBoard::from_square(source) != EMPTY {
                return true;
            }
        }
    }
    false
}
