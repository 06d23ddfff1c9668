//! Strategic metrics calculator.
//!
//! Every metric is a pure function of the board; nothing is carried over
//! between positions, so recomputing the same FEN always gives the same result.

use chess::{BitBoard, Board, ChessMove, Color, MoveGen, Piece, Square, EMPTY};
use serde::{Deserialize, Serialize};

use crate::board_utils::{
    attacker_count, attackers, attacks, file_mask, king_square, material_count, pieces_of,
    square,
};

const CORE_CENTER: [(usize, usize); 4] = [(3, 3), (4, 3), (3, 4), (4, 4)];

/// Tunable weights. King safety terms are applied so that more shield pawns
/// never hurt and more open lines or attackers never help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricWeights {
    pub shield_pawn: i32,
    pub open_line: i32,
    pub king_attacker: i32,
    pub doubled_pawn: i32,
    pub isolated_pawn: i32,
    pub passed_pawn: i32,
    pub core_center: i32,
    pub extended_center: i32,
    pub center_occupation: i32,
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            shield_pawn: 10,
            open_line: 15,
            king_attacker: 8,
            doubled_pawn: -15,
            isolated_pawn: -12,
            passed_pawn: 20,
            core_center: 2,
            extended_center: 1,
            center_occupation: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KingSafety {
    pub shield_pawns: u32,
    pub open_lines: u32,
    pub attackers: u32,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterControl {
    /// Attacks on d4, d5, e4, e5
    pub core: u32,
    /// Attacks on c3-f6
    pub extended: u32,
    /// Own pieces standing on the core squares
    pub occupation: u32,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PawnStructure {
    pub doubled: u32,
    pub isolated: u32,
    pub passed: u32,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceActivity {
    pub count: u32,
    /// Legal moves starting from these pieces. Always 0 for the king.
    pub mobility: Option<u32>,
    /// Attacked squares summed over the pieces, own-occupied squares included
    pub attacks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceActivityTable {
    pub pawn: PieceActivity,
    pub knight: PieceActivity,
    pub bishop: PieceActivity,
    pub rook: PieceActivity,
    pub queen: PieceActivity,
    pub king: PieceActivity,
}

impl PieceActivityTable {
    pub fn get(&self, piece: Piece) -> &PieceActivity {
        match piece {
            Piece::Pawn => &self.pawn,
            Piece::Knight => &self.knight,
            Piece::Bishop => &self.bishop,
            Piece::Rook => &self.rook,
            Piece::Queen => &self.queen,
            Piece::King => &self.king,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideMetrics {
    pub material: i32,
    /// Legal moves; for the side not to move, counted as if it were its turn.
    /// `None` when that is impossible because the side to move is in check.
    pub mobility: Option<u32>,
    pub king_safety: KingSafety,
    pub center: CenterControl,
    pub pawn_structure: PawnStructure,
    pub development: u32,
    pub activity: PieceActivityTable,
}

/// White minus Black for each metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDifferential {
    pub material: i32,
    pub mobility: Option<i32>,
    pub king_safety: i32,
    pub center: i32,
    pub pawn_structure: i32,
    pub development: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicMetrics {
    #[serde(with = "crate::position::serde_color")]
    pub side_to_move: Color,
    pub white: SideMetrics,
    pub black: SideMetrics,
    pub differential: MetricDifferential,
}

impl StrategicMetrics {
    pub fn side(&self, color: Color) -> &SideMetrics {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    /// White-minus-black material.
    pub fn material_diff(&self) -> i32 {
        self.differential.material
    }
}

/// Compute all metrics for both sides.
pub fn compute(board: &Board) -> StrategicMetrics {
    compute_weighted(board, &MetricWeights::default())
}

pub fn compute_weighted(board: &Board, weights: &MetricWeights) -> StrategicMetrics {
    let white = side_metrics(board, Color::White, weights);
    let black = side_metrics(board, Color::Black, weights);

    let differential = MetricDifferential {
        material: white.material - black.material,
        mobility: white
            .mobility
            .zip(black.mobility)
            .map(|(w, b)| w as i32 - b as i32),
        king_safety: white.king_safety.score - black.king_safety.score,
        center: white.center.score - black.center.score,
        pawn_structure: white.pawn_structure.score - black.pawn_structure.score,
        development: white.development as i32 - black.development as i32,
    };

    StrategicMetrics {
        side_to_move: board.side_to_move(),
        white,
        black,
        differential,
    }
}

fn side_metrics(board: &Board, color: Color, weights: &MetricWeights) -> SideMetrics {
    let moves = legal_moves(board, color);
    SideMetrics {
        material: material_count(board, color),
        mobility: moves.as_ref().map(|m| m.len() as u32),
        king_safety: king_safety(board, color, weights),
        center: center_control(board, color, weights),
        pawn_structure: pawn_structure(board, color, weights),
        development: development(board, color),
        activity: activity_table(board, color, moves.as_deref()),
    }
}

/// Legal moves for `color`. The opponent of the side to move is evaluated
/// on a null-move copy; the input board is never touched.
fn legal_moves(board: &Board, color: Color) -> Option<Vec<ChessMove>> {
    if board.side_to_move() == color {
        Some(MoveGen::new_legal(board).collect())
    } else {
        board
            .null_move()
            .map(|flipped| MoveGen::new_legal(&flipped).collect())
    }
}

/// Legal move count for `color`, `None` when the opponent is in check.
pub fn mobility(board: &Board, color: Color) -> Option<u32> {
    legal_moves(board, color).map(|m| m.len() as u32)
}

/// Count, mobility and attacks per piece type for `color`.
pub fn piece_activity(board: &Board, color: Color) -> PieceActivityTable {
    activity_table(board, color, legal_moves(board, color).as_deref())
}

fn activity_table(
    board: &Board,
    color: Color,
    moves: Option<&[ChessMove]>,
) -> PieceActivityTable {
    let of = |piece: Piece| {
        let pieces = pieces_of(board, color, piece);
        let mobility = moves.map(|moves| match piece {
            Piece::King => 0,
            _ => moves
                .iter()
                .filter(|m| pieces & BitBoard::from_square(m.get_source()) != EMPTY)
                .count() as u32,
        });
        PieceActivity {
            count: pieces.popcnt(),
            mobility,
            attacks: pieces.map(|sq| attacks(board, sq).popcnt()).sum(),
        }
    };

    PieceActivityTable {
        pawn: of(Piece::Pawn),
        knight: of(Piece::Knight),
        bishop: of(Piece::Bishop),
        rook: of(Piece::Rook),
        queen: of(Piece::Queen),
        king: of(Piece::King),
    }
}

fn forward(color: Color, rank: usize, steps: usize) -> Option<usize> {
    match color {
        Color::White => Some(rank + steps).filter(|r| *r < 8),
        Color::Black => rank.checked_sub(steps),
    }
}

fn king_files(king: Square) -> impl Iterator<Item = usize> {
    let file = king.get_file().to_index();
    file.saturating_sub(1)..=(file + 1).min(7)
}

pub fn king_safety(board: &Board, color: Color, weights: &MetricWeights) -> KingSafety {
    let king = king_square(board, color);
    let rank = king.get_rank().to_index();
    let own_pawns = pieces_of(board, color, Piece::Pawn);

    let mut shield_pawns = 0;
    let mut open_lines = 0;
    for file in king_files(king) {
        for steps in 1..=2 {
            if let Some(r) = forward(color, rank, steps) {
                if own_pawns & BitBoard::from_square(square(file, r)) != EMPTY {
                    shield_pawns += 1;
                }
            }
        }
        if own_pawns & file_mask(file) == EMPTY {
            open_lines += 1;
        }
    }

    let zone = chess::get_king_moves(king) | BitBoard::from_square(king);
    let mut zone_attackers = EMPTY;
    for sq in zone {
        zone_attackers |= attackers(board, !color, sq);
    }
    let attackers = zone_attackers.popcnt();

    KingSafety {
        shield_pawns,
        open_lines,
        attackers,
        score: shield_pawns as i32 * weights.shield_pawn
            - open_lines as i32 * weights.open_line
            - attackers as i32 * weights.king_attacker,
    }
}

pub fn center_control(board: &Board, color: Color, weights: &MetricWeights) -> CenterControl {
    let own = *board.color_combined(color);

    let core = CORE_CENTER
        .iter()
        .map(|&(f, r)| attacker_count(board, color, square(f, r)))
        .sum::<u32>();
    let extended = (2..=5)
        .flat_map(|f| (2..=5).map(move |r| square(f, r)))
        .map(|sq| attacker_count(board, color, sq))
        .sum::<u32>();
    let occupation = CORE_CENTER
        .iter()
        .filter(|&&(f, r)| own & BitBoard::from_square(square(f, r)) != EMPTY)
        .count() as u32;

    CenterControl {
        core,
        extended,
        occupation,
        score: core as i32 * weights.core_center
            + extended as i32 * weights.extended_center
            + occupation as i32 * weights.center_occupation,
    }
}

pub fn pawn_structure(board: &Board, color: Color, weights: &MetricWeights) -> PawnStructure {
    let own = pieces_of(board, color, Piece::Pawn);
    let enemy = pieces_of(board, !color, Piece::Pawn);

    let per_file: Vec<u32> = (0..8).map(|f| (own & file_mask(f)).popcnt()).collect();
    let doubled = per_file.iter().map(|n| n.saturating_sub(1)).sum::<u32>();

    let mut isolated = 0;
    let mut passed = 0;
    for pawn in own {
        let file = pawn.get_file().to_index();
        let rank = pawn.get_rank().to_index();

        let neighbours = [file.checked_sub(1), Some(file + 1).filter(|f| *f < 8)];
        if neighbours.iter().flatten().all(|f| per_file[*f] == 0) {
            isolated += 1;
        }

        let blocked = (file.saturating_sub(1)..=(file + 1).min(7)).any(|f| {
            (enemy & file_mask(f)).into_iter().any(|e| {
                let er = e.get_rank().to_index();
                match color {
                    Color::White => er > rank,
                    Color::Black => er < rank,
                }
            })
        });
        if !blocked {
            passed += 1;
        }
    }

    PawnStructure {
        doubled,
        isolated,
        passed,
        score: doubled as i32 * weights.doubled_pawn
            + isolated as i32 * weights.isolated_pawn
            + passed as i32 * weights.passed_pawn,
    }
}

/// Minor pieces and the queen that have left their home squares.
pub fn development(board: &Board, color: Color) -> u32 {
    let home_rank = match color {
        Color::White => 0,
        Color::Black => 7,
    };
    let homes = [
        (1, Piece::Knight),
        (2, Piece::Bishop),
        (3, Piece::Queen),
        (5, Piece::Bishop),
        (6, Piece::Knight),
    ];
    homes
        .iter()
        .filter(|&&(file, piece)| {
            let sq = square(file, home_rank);
            !(board.piece_on(sq) == Some(piece) && board.color_on(sq) == Some(color))
        })
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_start_position() {
        let metrics = compute(&Board::default());
        assert_eq!(metrics.material_diff(), 0);
        assert_eq!(metrics.white.material, 39);
        assert_eq!(metrics.white.mobility, Some(20));
        assert_eq!(metrics.black.mobility, Some(20));
        assert_eq!(metrics.white.development, 0);
        assert_eq!(metrics.white.center.core, 0);
        assert_eq!(metrics.white.center.occupation, 0);
        assert_eq!(metrics.white.pawn_structure.doubled, 0);
        assert_eq!(metrics.white.pawn_structure.isolated, 0);
        assert_eq!(metrics.white.pawn_structure.passed, 0);
        assert_eq!(metrics.white.king_safety.shield_pawns, 3);
        assert_eq!(metrics.white.king_safety.open_lines, 0);
        assert_eq!(metrics.differential.king_safety, 0);
        assert_eq!(metrics.differential.mobility, Some(0));
    }

    #[test]
    fn test_is_idempotent() {
        let board =
            Board::from_str("r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4")
                .unwrap();
        assert_eq!(compute(&board), compute(&board));
        assert_eq!(compute(&board).white.development, 2);
        assert_eq!(compute(&board).black.development, 2);
    }

    #[test]
    fn test_mobility_when_in_check() {
        // Black to move and in check from the rook: White's "as if" mobility is unknown
        let board = Board::from_str("4k3/8/8/8/8/8/8/K3R3 b - - 0 1").unwrap();
        assert_eq!(mobility(&board, Color::White), None);
        assert!(mobility(&board, Color::Black).is_some());
        assert_eq!(compute(&board).differential.mobility, None);
    }

    #[test]
    fn test_piece_activity_at_start() {
        let board = Board::default();
        let white = piece_activity(&board, Color::White);

        let knights = white.get(Piece::Knight);
        assert_eq!(knights.count, 2);
        assert_eq!(knights.mobility, Some(4));
        assert_eq!(knights.attacks, 6);

        assert_eq!(white.pawn.count, 8);
        assert_eq!(white.pawn.mobility, Some(16));
        assert_eq!(white.pawn.attacks, 14);
        assert_eq!(white.bishop.mobility, Some(0));
        assert_eq!(white.queen.attacks, 5);
        assert_eq!(white.king.mobility, Some(0));

        assert_eq!(piece_activity(&board, Color::Black), white);
        assert_eq!(compute(&board).white.activity, white);
    }

    #[test]
    fn test_piece_activity_when_in_check() {
        let board = Board::from_str("4k3/8/8/8/8/8/8/K3R3 b - - 0 1").unwrap();
        let white = piece_activity(&board, Color::White);
        assert_eq!(white.rook.count, 1);
        assert_eq!(white.rook.mobility, None);
        assert_eq!(white.rook.attacks, 14);
        assert_eq!(piece_activity(&board, Color::Black).king.mobility, Some(0));
    }

    #[test]
    fn test_pawn_structure() {
        // White: doubled c-pawns, no pawn has a neighbour, h-pawn held by g7
        let board = Board::from_str("4k3/6p1/8/7P/8/2P5/P1P5/4K3 w - - 0 1").unwrap();
        let ps = pawn_structure(&board, Color::White, &MetricWeights::default());
        assert_eq!(ps.doubled, 1);
        assert_eq!(ps.isolated, 4);
        assert_eq!(ps.passed, 3);

        let black = pawn_structure(&board, Color::Black, &MetricWeights::default());
        assert_eq!(black.passed, 0);
    }

    #[test]
    fn test_king_safety_is_monotonic() {
        let weights = MetricWeights::default();
        let sheltered = Board::from_str("4k3/8/8/8/8/8/5PPP/6K1 w - - 0 1").unwrap();
        let exposed = Board::from_str("4k3/8/8/8/8/8/5P2/6K1 w - - 0 1").unwrap();
        let attacked = Board::from_str("4k3/8/8/8/8/8/5P2/r5K1 w - - 0 1").unwrap();

        let a = king_safety(&sheltered, Color::White, &weights);
        let b = king_safety(&exposed, Color::White, &weights);
        let c = king_safety(&attacked, Color::White, &weights);
        assert!(a.score > b.score);
        assert!(b.score > c.score);
        assert_eq!(b.open_lines, 2);
        assert!(c.attackers >= 1);
    }

    #[test]
    fn test_center_occupation() {
        let board =
            Board::from_str("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2")
                .unwrap();
        let white = center_control(&board, Color::White, &MetricWeights::default());
        let black = center_control(&board, Color::Black, &MetricWeights::default());
        assert_eq!(white.occupation, 1);
        assert_eq!(black.occupation, 1);
        assert!(white.core >= 1);
    }
}
