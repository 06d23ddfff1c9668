//! Move notation: accepts UCI or SAN input, renders SAN for display and ordering.

use chess::{Board, ChessMove, MoveGen};
use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess};

use crate::error::AnalysisError;

/// A legal move in a specific position, in both notations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedMove {
    pub uci: String,
    pub san: String,
}

fn to_shakmaty(fen: &str) -> Result<Chess, AnalysisError> {
    let setup: Fen = fen
        .parse()
        .map_err(|e| AnalysisError::InvalidPosition(format!("{e}: {fen}")))?;
    setup
        .into_position(CastlingMode::Standard)
        .map_err(|e| AnalysisError::InvalidPosition(format!("{e}: {fen}")))
}

/// Resolve a move given in UCI ("e2e4", "e7e8q") or SAN ("Nf3", "O-O", "exd5+").
pub fn resolve_move(fen: &str, text: &str) -> Result<ResolvedMove, AnalysisError> {
    let pos = to_shakmaty(fen)?;
    let text = text.trim();
    let illegal = |reason: String| AnalysisError::InvalidMove {
        mv: text.to_string(),
        reason,
    };

    let m = match text.parse::<UciMove>() {
        Ok(uci) => uci.to_move(&pos).map_err(|e| illegal(e.to_string()))?,
        Err(_) => {
            let san: SanPlus = text
                .parse()
                .map_err(|_| illegal("not UCI or SAN notation".to_string()))?;
            san.san.to_move(&pos).map_err(|e| illegal(e.to_string()))?
        }
    };

    Ok(ResolvedMove {
        uci: m.to_uci(CastlingMode::Standard).to_string(),
        san: SanPlus::from_move(pos, m).to_string(),
    })
}

/// SAN for a UCI move, falling back to the UCI text when it does not apply.
pub fn san_for(fen: &str, uci: &str) -> String {
    resolve_move(fen, uci)
        .map(|m| m.san)
        .unwrap_or_else(|_| uci.to_string())
}

/// Find the legal `chess` move matching a UCI string.
pub fn find_uci_move(board: &Board, uci: &str) -> Option<ChessMove> {
    MoveGen::new_legal(board).find(|m| m.to_string() == uci)
}
