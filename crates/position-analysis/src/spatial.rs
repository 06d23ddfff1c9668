//! Spatial control analyzer: who attacks each of the 64 squares.

use chess::{Board, Color, Square, ALL_SQUARES};
use serde::{Deserialize, Serialize};

use crate::board_utils::attacker_count;

/// Presence-based control. Attacker counts are kept for display but never
/// move a square between labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlLabel {
    Own,
    Opponent,
    Contested,
    Neutral,
}

impl ControlLabel {
    pub fn from_counts(own: u32, opponent: u32) -> Self {
        match (own > 0, opponent > 0) {
            (true, false) => ControlLabel::Own,
            (false, true) => ControlLabel::Opponent,
            (true, true) => ControlLabel::Contested,
            (false, false) => ControlLabel::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareControl {
    pub square: String,
    pub label: ControlLabel,
    pub own_attackers: u32,
    pub opponent_attackers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceSummary {
    pub own: u32,
    pub opponent: u32,
    pub contested: u32,
    pub neutral: u32,
    pub own_percentage: f64,
    pub opponent_percentage: f64,
    pub contested_percentage: f64,
    pub neutral_percentage: f64,
    /// Own squares minus opponent squares
    pub space_advantage: i32,
}

fn percentage(count: u32) -> f64 {
    (count as f64 / 64.0 * 10_000.0).round() / 100.0
}

/// One entry per square, indexed a1 = 0 .. h8 = 63.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceControlBoard {
    #[serde(with = "crate::position::serde_color")]
    pub owner: Color,
    pub squares: Vec<SquareControl>,
    pub summary: SpaceSummary,
}

impl SpaceControlBoard {
    pub fn get(&self, square: Square) -> &SquareControl {
        &self.squares[square.to_index()]
    }

    pub fn label(&self, square: Square) -> ControlLabel {
        self.get(square).label
    }

    pub fn count(&self, label: ControlLabel) -> u32 {
        self.squares.iter().filter(|s| s.label == label).count() as u32
    }
}

/// Control map from the side to move's point of view.
pub fn compute_space_control(board: &Board) -> SpaceControlBoard {
    compute_space_control_for(board, board.side_to_move())
}

pub fn compute_space_control_for(board: &Board, owner: Color) -> SpaceControlBoard {
    let squares: Vec<SquareControl> = ALL_SQUARES
        .iter()
        .map(|&sq| {
            let own_attackers = attacker_count(board, owner, sq);
            let opponent_attackers = attacker_count(board, !owner, sq);
            SquareControl {
                square: sq.to_string(),
                label: ControlLabel::from_counts(own_attackers, opponent_attackers),
                own_attackers,
                opponent_attackers,
            }
        })
        .collect();

    let tally = |label: ControlLabel| squares.iter().filter(|s| s.label == label).count() as u32;
    let own = tally(ControlLabel::Own);
    let opponent = tally(ControlLabel::Opponent);
    let contested = tally(ControlLabel::Contested);
    let neutral = tally(ControlLabel::Neutral);

    let summary = SpaceSummary {
        own,
        opponent,
        contested,
        neutral,
        own_percentage: percentage(own),
        opponent_percentage: percentage(opponent),
        contested_percentage: percentage(contested),
        neutral_percentage: percentage(neutral),
        space_advantage: own as i32 - opponent as i32,
    };

    SpaceControlBoard {
        owner,
        squares,
        summary,
    }
}
