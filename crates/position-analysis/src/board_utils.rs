/// Board utility functions shared by metrics, spatial control and tactics

use chess::{BitBoard, Board, Color, File, Piece, Rank, Square, EMPTY};

// Piece values for material calculation
pub const PAWN_VALUE: i32 = 1;
pub const KNIGHT_VALUE: i32 = 3;
pub const BISHOP_VALUE: i32 = 3;
pub const ROOK_VALUE: i32 = 5;
pub const QUEEN_VALUE: i32 = 9;
pub const KING_VALUE: i32 = 99;

/// Piece value (no king)
pub fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => PAWN_VALUE,
        Piece::Knight => KNIGHT_VALUE,
        Piece::Bishop => BISHOP_VALUE,
        Piece::Rook => ROOK_VALUE,
        Piece::Queen => QUEEN_VALUE,
        Piece::King => 0,
    }
}

/// Piece value including king, for comparing attack targets
pub fn king_value(piece: Piece) -> i32 {
    match piece {
        Piece::King => KING_VALUE,
        other => piece_value(other),
    }
}

pub fn is_ray_piece(piece: Piece) -> bool {
    matches!(piece, Piece::Queen | Piece::Rook | Piece::Bishop)
}

pub fn piece_name(piece: Piece) -> &'static str {
    match piece {
        Piece::Pawn => "pawn",
        Piece::Knight => "knight",
        Piece::Bishop => "bishop",
        Piece::Rook => "rook",
        Piece::Queen => "queen",
        Piece::King => "king",
    }
}

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

/// Squares attacked by the piece on `square` (empty if none)
pub fn attacks(board: &Board, square: Square) -> BitBoard {
    let (piece, color) = match (board.piece_on(square), board.color_on(square)) {
        (Some(p), Some(c)) => (p, c),
        _ => return EMPTY,
    };
    let occupied = *board.combined();

    match piece {
        Piece::Pawn => pawn_attacks(square, color),
        Piece::Knight => chess::get_knight_moves(square),
        Piece::King => chess::get_king_moves(square),
        Piece::Bishop => chess::get_bishop_moves(square, occupied),
        Piece::Rook => chess::get_rook_moves(square, occupied),
        Piece::Queen => {
            chess::get_bishop_moves(square, occupied) | chess::get_rook_moves(square, occupied)
        }
    }
}

/// Pawn capture squares (diagonals only, never pushes)
pub fn pawn_attacks(square: Square, color: Color) -> BitBoard {
    let file = square.get_file().to_index();
    let rank = square.get_rank().to_index();

    let target_rank = match color {
        Color::White if rank < 7 => rank + 1,
        Color::Black if rank > 0 => rank - 1,
        _ => return EMPTY,
    };

    let mut result = EMPTY;
    if file > 0 {
        result |= BitBoard::from_square(Square::make_square(
            Rank::from_index(target_rank),
            File::from_index(file - 1),
        ));
    }
    if file < 7 {
        result |= BitBoard::from_square(Square::make_square(
            Rank::from_index(target_rank),
            File::from_index(file + 1),
        ));
    }
    result
}

/// All pieces of `color` attacking `square`
pub fn attackers(board: &Board, color: Color, square: Square) -> BitBoard {
    let occupied = *board.combined();
    let ours = *board.color_combined(color);
    let diagonal = *board.pieces(Piece::Bishop) | *board.pieces(Piece::Queen);
    let orthogonal = *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);

    // Pawns: reverse lookup from the target with the opposite color
    (pawn_attacks(square, !color) & *board.pieces(Piece::Pawn)
        | chess::get_knight_moves(square) & *board.pieces(Piece::Knight)
        | chess::get_king_moves(square) & *board.pieces(Piece::King)
        | chess::get_bishop_moves(square, occupied) & diagonal
        | chess::get_rook_moves(square, occupied) & orthogonal)
        & ours
}

pub fn attacker_count(board: &Board, color: Color, square: Square) -> u32 {
    attackers(board, color, square).popcnt()
}

pub fn king_square(board: &Board, color: Color) -> Square {
    board.king_square(color)
}

pub fn is_defended(board: &Board, color: Color, square: Square) -> bool {
    attackers(board, color, square) != EMPTY
}

/// Attacked by the opponent and either undefended or attackable by a cheaper piece.
pub fn is_en_prise(board: &Board, square: Square) -> bool {
    let (piece, color) = match (board.piece_on(square), board.color_on(square)) {
        (Some(p), Some(c)) => (p, c),
        _ => return false,
    };
    if piece == Piece::King {
        return false;
    }

    let enemy = attackers(board, !color, square);
    if enemy == EMPTY {
        return false;
    }
    if !is_defended(board, color, square) {
        return true;
    }
    enemy.into_iter().any(|sq| {
        board
            .piece_on(sq)
            .is_some_and(|p| p != Piece::King && piece_value(p) < piece_value(piece))
    })
}

/// Count material for one side
pub fn material_count(board: &Board, color: Color) -> i32 {
    let color_bb = *board.color_combined(color);
    [Piece::Pawn, Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen]
        .into_iter()
        .map(|p| (*board.pieces(p) & color_bb).popcnt() as i32 * piece_value(p))
        .sum()
}

pub fn pieces_of(board: &Board, color: Color, piece: Piece) -> BitBoard {
    *board.pieces(piece) & *board.color_combined(color)
}

pub fn file_mask(file: usize) -> BitBoard {
    chess::get_file(File::from_index(file))
}

pub fn square(file: usize, rank: usize) -> Square {
    Square::make_square(Rank::from_index(rank), File::from_index(file))
}
