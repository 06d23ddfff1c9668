//! Move classification: centipawn loss and quality bands.
//! Pure functions only, no engine or board dependencies.

use std::fmt;
use std::str::FromStr;

use chess::Color;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::evaluation::{Evaluation, CENTIPAWN_LIMIT};

/// Loss charged when a move throws away a forced mate or walks into one.
pub const MATE_SWING_LOSS: u32 = 1000;

/// Quality labels, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveQuality {
    Excellent,
    Good,
    Okay,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl MoveQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveQuality::Excellent => "excellent",
            MoveQuality::Good => "good",
            MoveQuality::Okay => "okay",
            MoveQuality::Inaccuracy => "inaccuracy",
            MoveQuality::Mistake => "mistake",
            MoveQuality::Blunder => "blunder",
        }
    }
}

impl fmt::Display for MoveQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive upper bounds of each band; anything above `mistake` is a blunder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationBands {
    pub excellent: u32,
    pub good: u32,
    pub okay: u32,
    pub inaccuracy: u32,
    pub mistake: u32,
}

impl Default for ClassificationBands {
    fn default() -> Self {
        Self {
            excellent: 10,
            good: 25,
            okay: 50,
            inaccuracy: 100,
            mistake: 300,
        }
    }
}

impl ClassificationBands {
    pub fn label(&self, loss_cp: u32) -> MoveQuality {
        if loss_cp <= self.excellent {
            MoveQuality::Excellent
        } else if loss_cp <= self.good {
            MoveQuality::Good
        } else if loss_cp <= self.okay {
            MoveQuality::Okay
        } else if loss_cp <= self.inaccuracy {
            MoveQuality::Inaccuracy
        } else if loss_cp <= self.mistake {
            MoveQuality::Mistake
        } else {
            MoveQuality::Blunder
        }
    }
}

/// Parses `"10,25,50,100,300"`. Bounds must be strictly increasing.
impl FromStr for ClassificationBands {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bounds: Vec<u32> = s
            .split(',')
            .map(|v| v.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|e| AnalysisError::Config(format!("classification bands '{s}': {e}")))?;

        if bounds.len() != 5 {
            return Err(AnalysisError::Config(format!(
                "classification bands '{s}': expected 5 bounds, found {}",
                bounds.len()
            )));
        }
        if bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AnalysisError::Config(format!(
                "classification bands '{s}': bounds must increase"
            )));
        }

        Ok(Self {
            excellent: bounds[0],
            good: bounds[1],
            okay: bounds[2],
            inaccuracy: bounds[3],
            mistake: bounds[4],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveClassification {
    pub loss_cp: u32,
    pub quality: MoveQuality,
}

/// Loss of `played` against `best`, both from the mover's perspective.
pub fn centipawn_loss(best: Evaluation, played: Evaluation) -> u32 {
    if played >= best {
        return 0;
    }
    match (best, played) {
        (Evaluation::Centipawns(b), Evaluation::Centipawns(p)) => {
            let clamp = |cp: i32| cp.clamp(-CENTIPAWN_LIMIT, CENTIPAWN_LIMIT);
            (clamp(b) - clamp(p)).unsigned_abs()
        }
        (Evaluation::Mate(b), Evaluation::Mate(p)) if (b > 0) == (p > 0) => 0,
        _ => MATE_SWING_LOSS,
    }
}

/// Classify from white-relative scores; both are flipped to `side_to_move`
/// before subtracting.
pub fn classify(
    played_score: Evaluation,
    best_score: Evaluation,
    side_to_move: Color,
    bands: &ClassificationBands,
) -> MoveClassification {
    let played = played_score.relative_to(Color::White, side_to_move);
    let best = best_score.relative_to(Color::White, side_to_move);
    let loss_cp = centipawn_loss(best, played);
    MoveClassification {
        loss_cp,
        quality: bands.label(loss_cp),
    }
}

/// As [`classify`], but the engine's own best move is always loss 0.
pub fn classify_move(
    played_uci: &str,
    best_uci: &str,
    played_score: Evaluation,
    best_score: Evaluation,
    side_to_move: Color,
    bands: &ClassificationBands,
) -> MoveClassification {
    if played_uci == best_uci {
        return MoveClassification {
            loss_cp: 0,
            quality: MoveQuality::Excellent,
        };
    }
    classify(played_score, best_score, side_to_move, bands)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands() {
        let bands = ClassificationBands::default();
        assert_eq!(bands.label(0), MoveQuality::Excellent);
        assert_eq!(bands.label(10), MoveQuality::Excellent);
        assert_eq!(bands.label(11), MoveQuality::Good);
        assert_eq!(bands.label(25), MoveQuality::Good);
        assert_eq!(bands.label(26), MoveQuality::Okay);
        assert_eq!(bands.label(50), MoveQuality::Okay);
        assert_eq!(bands.label(51), MoveQuality::Inaccuracy);
        assert_eq!(bands.label(100), MoveQuality::Inaccuracy);
        assert_eq!(bands.label(101), MoveQuality::Mistake);
        assert_eq!(bands.label(300), MoveQuality::Mistake);
        assert_eq!(bands.label(301), MoveQuality::Blunder);
    }

    #[test]
    fn test_labels_are_monotonic() {
        let bands = ClassificationBands::default();
        let mut previous = MoveQuality::Excellent;
        for loss in 0..2000 {
            let label = bands.label(loss);
            assert!(label >= previous, "loss {loss} improved the label");
            previous = label;
        }
    }

    #[test]
    fn test_parse_bands() {
        let bands: ClassificationBands = "5, 20,40,80,250".parse().unwrap();
        assert_eq!(bands.excellent, 5);
        assert_eq!(bands.mistake, 250);
        assert_eq!(
            "10,25,50,100,300".parse::<ClassificationBands>().unwrap(),
            ClassificationBands::default()
        );
        assert!("10,25,50".parse::<ClassificationBands>().is_err());
        assert!("10,25,25,100,300".parse::<ClassificationBands>().is_err());
        assert!("a,b,c,d,e".parse::<ClassificationBands>().is_err());
    }

    #[test]
    fn test_centipawn_loss() {
        use Evaluation::*;
        assert_eq!(centipawn_loss(Centipawns(50), Centipawns(20)), 30);
        assert_eq!(centipawn_loss(Centipawns(50), Centipawns(80)), 0);
        assert_eq!(centipawn_loss(Centipawns(-20), Centipawns(-120)), 100);
        assert_eq!(centipawn_loss(Mate(3), Mate(5)), 0);
        assert_eq!(centipawn_loss(Mate(-5), Mate(-2)), 0);
        assert_eq!(centipawn_loss(Mate(2), Centipawns(900)), MATE_SWING_LOSS);
        assert_eq!(centipawn_loss(Centipawns(0), Mate(-4)), MATE_SWING_LOSS);
        assert_eq!(centipawn_loss(Mate(-3), Centipawns(-500)), 0);
    }

    #[test]
    fn test_centipawn_loss_with_extreme_scores() {
        use Evaluation::*;
        assert_eq!(
            centipawn_loss(Centipawns(2_000_000_000), Centipawns(-2_000_000_000)),
            2 * CENTIPAWN_LIMIT as u32
        );
        assert_eq!(centipawn_loss(Centipawns(i32::MAX), Centipawns(i32::MIN)), 100_000);
        let bands = ClassificationBands::default();
        let c = classify(Centipawns(i32::MIN), Centipawns(i32::MAX), Color::White, &bands);
        assert_eq!(c.quality, MoveQuality::Blunder);
    }

    #[test]
    fn test_classify_normalizes_for_black() {
        let bands = ClassificationBands::default();
        // White-relative: best leaves White at -80, played leaves White at +40.
        let c = classify(
            Evaluation::Centipawns(40),
            Evaluation::Centipawns(-80),
            Color::Black,
            &bands,
        );
        assert_eq!(c.loss_cp, 120);
        assert_eq!(c.quality, MoveQuality::Mistake);

        let c = classify(
            Evaluation::Centipawns(40),
            Evaluation::Centipawns(-80),
            Color::White,
            &bands,
        );
        assert_eq!(c.loss_cp, 0);
    }

    #[test]
    fn test_best_move_is_always_excellent() {
        let bands = ClassificationBands::default();
        let c = classify_move(
            "e2e4",
            "e2e4",
            Evaluation::Centipawns(21),
            Evaluation::Centipawns(35),
            Color::White,
            &bands,
        );
        assert_eq!(c.loss_cp, 0);
        assert_eq!(c.quality, MoveQuality::Excellent);

        let c = classify_move(
            "d2d4",
            "e2e4",
            Evaluation::Centipawns(21),
            Evaluation::Centipawns(35),
            Color::White,
            &bands,
        );
        assert_eq!(c.loss_cp, 14);
        assert_eq!(c.quality, MoveQuality::Good);
    }
}
