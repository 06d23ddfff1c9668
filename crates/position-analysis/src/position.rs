//! Position input model: FEN validation, last-move provenance and game phase.

use std::num::NonZeroU32;
use std::str::FromStr;

use chess::{Board, CastleRights, Color};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// How the position was reached.
///
/// Root positions and corrupt import rows both used to arrive with a zero move
/// number; they are kept apart here and never collapsed into each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LastMove {
    NoPriorMove,
    Played {
        san: String,
        piece: Option<String>,
        move_number: NonZeroU32,
    },
    Malformed {
        reason: String,
    },
}

impl LastMove {
    /// Interpret the raw last-move columns of an imported row.
    pub fn from_import(move_number: Option<u32>, san: Option<&str>, piece: Option<&str>) -> Self {
        let san = san.map(str::trim).filter(|s| !s.is_empty());
        match (move_number, san) {
            (None | Some(0), None) => LastMove::NoPriorMove,
            (Some(n), Some(san)) => match NonZeroU32::new(n) {
                Some(move_number) => LastMove::Played {
                    san: san.to_string(),
                    piece: piece.map(str::to_string),
                    move_number,
                },
                None => LastMove::Malformed {
                    reason: format!("move {san} recorded with move number 0"),
                },
            },
            (None, Some(san)) => LastMove::Malformed {
                reason: format!("move {san} recorded without a move number"),
            },
            (Some(n), None) => LastMove::Malformed {
                reason: format!("move number {n} recorded without a move"),
            },
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, LastMove::NoPriorMove)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl GamePhase {
    /// Phase by piece count on the board.
    pub fn of(board: &Board) -> Self {
        match board.combined().popcnt() {
            n if n > 20 => GamePhase::Opening,
            n if n > 12 => GamePhase::Middlegame,
            _ => GamePhase::Endgame,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub fn of(board: &Board) -> Self {
        let white = board.castle_rights(Color::White);
        let black = board.castle_rights(Color::Black);
        Self {
            white_kingside: matches!(white, CastleRights::KingSide | CastleRights::Both),
            white_queenside: matches!(white, CastleRights::QueenSide | CastleRights::Both),
            black_kingside: matches!(black, CastleRights::KingSide | CastleRights::Both),
            black_queenside: matches!(black, CastleRights::QueenSide | CastleRights::Both),
        }
    }
}

/// A validated position. Immutable once constructed; deserializing runs the
/// same FEN check as [`Position::from_fen`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PositionRecord", into = "PositionRecord")]
pub struct Position {
    fen: String,
    last_move: LastMove,
    board: Board,
}

/// Wire form of [`Position`].
#[derive(Serialize, Deserialize)]
struct PositionRecord {
    fen: String,
    last_move: LastMove,
}

impl TryFrom<PositionRecord> for Position {
    type Error = AnalysisError;

    fn try_from(record: PositionRecord) -> Result<Self, Self::Error> {
        Self::with_last_move(&record.fen, record.last_move)
    }
}

impl From<Position> for PositionRecord {
    fn from(position: Position) -> Self {
        Self {
            fen: position.fen,
            last_move: position.last_move,
        }
    }
}

impl Position {
    pub fn from_fen(fen: &str) -> Result<Self, AnalysisError> {
        Self::with_last_move(fen, LastMove::NoPriorMove)
    }

    pub fn with_last_move(fen: &str, last_move: LastMove) -> Result<Self, AnalysisError> {
        let fen = normalize_whitespace(fen);
        let board = validate_fen(&fen)?;
        Ok(Self {
            fen,
            last_move,
            board,
        })
    }

    /// Normalized FEN.
    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn last_move(&self) -> &LastMove {
        &self.last_move
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    pub fn game_phase(&self) -> GamePhase {
        GamePhase::of(&self.board)
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fen
            .split_whitespace()
            .nth(5)
            .and_then(|n| n.parse().ok())
            .unwrap_or(1)
    }
}

fn normalize_whitespace(fen: &str) -> String {
    fen.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Serde adapter for `chess::Color` as `"white"` / `"black"`.
pub(crate) mod serde_color {
    use chess::Color;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(crate::board_utils::color_name(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color, D::Error> {
        match String::deserialize(deserializer)?.as_str() {
            "white" => Ok(Color::White),
            "black" => Ok(Color::Black),
            other => Err(serde::de::Error::unknown_variant(other, &["white", "black"])),
        }
    }
}

/// Structural FEN check followed by a full board-sanity check.
/// Nothing that fails here is ever sent to an engine.
pub fn validate_fen(fen: &str) -> Result<Board, AnalysisError> {
    let invalid = |reason: String| AnalysisError::InvalidPosition(format!("{reason}: {fen}"));

    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(invalid(format!("expected 6 fields, found {}", fields.len())));
    }

    let ranks: Vec<&str> = fields[0].split('/').collect();
    if ranks.len() != 8 {
        return Err(invalid(format!("expected 8 ranks, found {}", ranks.len())));
    }
    for rank in &ranks {
        let mut width = 0u32;
        for c in rank.chars() {
            match c {
                '1'..='8' => width += c.to_digit(10).unwrap_or(0),
                'p' | 'n' | 'b' | 'r' | 'q' | 'k' | 'P' | 'N' | 'B' | 'R' | 'Q' | 'K' => width += 1,
                _ => return Err(invalid(format!("unexpected piece character '{c}'"))),
            }
        }
        if width != 8 {
            return Err(invalid(format!("rank '{rank}' does not span 8 files")));
        }
    }

    if fields[1] != "w" && fields[1] != "b" {
        return Err(invalid(format!("bad side to move '{}'", fields[1])));
    }
    if fields[2] != "-" && !fields[2].chars().all(|c| "KQkq".contains(c)) {
        return Err(invalid(format!("bad castling field '{}'", fields[2])));
    }
    let ep = fields[3];
    let ep_ok = ep == "-"
        || (ep.len() == 2
            && matches!(ep.as_bytes()[0], b'a'..=b'h')
            && matches!(ep.as_bytes()[1], b'3' | b'6'));
    if !ep_ok {
        return Err(invalid(format!("bad en passant field '{ep}'")));
    }
    if fields[4].parse::<u32>().is_err() || fields[5].parse::<u32>().is_err() {
        return Err(invalid("move counters must be non-negative integers".to_string()));
    }

    Board::from_str(fen).map_err(|e| invalid(e.to_string()))
}
