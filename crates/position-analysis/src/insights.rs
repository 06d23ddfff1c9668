//! Natural-language insight generation.
//!
//! Insights are a pluggable consumer of a finished analysis. Replacing or
//! removing the writer never changes any metric, score or classification.

use crate::comparison::{AnalysisStatus, ComparativeAnalysis, EntrySource};

pub trait InsightWriter: Send + Sync {
    fn write(&self, analysis: &ComparativeAnalysis) -> Vec<String>;
}

/// Template sentences built from the analysis fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleInsights;

impl RuleInsights {
    fn best_move(analysis: &ComparativeAnalysis) -> Option<String> {
        let best = analysis.best_move.as_ref()?;
        Some(match analysis.best_score {
            Some(score) => format!("Engine's choice is {} ({}).", best.san, score),
            None => format!("Engine's choice is {}.", best.san),
        })
    }

    fn alternatives(analysis: &ComparativeAnalysis) -> Option<String> {
        let losses: Vec<u32> = analysis
            .entries
            .iter()
            .filter(|e| !e.is_best)
            .filter_map(|e| e.loss_cp())
            .collect();
        let min = losses.iter().min()?;
        let max = losses.iter().max()?;
        Some(if min == max {
            format!("Alternatives lose {min} centipawns.")
        } else {
            format!("Alternatives lose between {min} and {max} centipawns.")
        })
    }

    fn played(analysis: &ComparativeAnalysis) -> Option<String> {
        let played = analysis.played_entry()?;
        if played.source == EntrySource::Unanalyzable {
            return Some(format!("{} could not be analyzed.", played.san));
        }
        let c = played.classification?;
        Some(if played.is_best {
            format!("{} matches the engine's choice.", played.san)
        } else {
            format!("{} is {} ({} centipawn loss).", played.san, c.quality, c.loss_cp)
        })
    }

    fn elements(analysis: &ComparativeAnalysis) -> Option<String> {
        let best = analysis.best_entry()?;
        if best.motifs.is_empty() {
            return Some("Key elements: positional play.".to_string());
        }
        let names: Vec<String> = best
            .motifs
            .iter()
            .map(|m| m.as_str().replace('_', " "))
            .collect();
        Some(format!("Key elements: {}.", names.join(", ")))
    }
}

impl InsightWriter for RuleInsights {
    fn write(&self, analysis: &ComparativeAnalysis) -> Vec<String> {
        match analysis.status {
            AnalysisStatus::NoLegalMoves => {
                return vec!["No legal moves in this position.".to_string()];
            }
            AnalysisStatus::Unanalyzable => {
                return vec!["The engine could not analyze this position.".to_string()];
            }
            AnalysisStatus::Complete | AnalysisStatus::Partial => {}
        }

        let mut insights: Vec<String> = [
            Self::best_move(analysis),
            Self::alternatives(analysis),
            Self::played(analysis),
            Self::elements(analysis),
        ]
        .into_iter()
        .flatten()
        .collect();

        if !analysis.hanging_pieces.is_empty() {
            let squares: Vec<&str> = analysis
                .hanging_pieces
                .iter()
                .map(|h| h.square.as_str())
                .collect();
            insights.push(format!("Pieces en prise on {}.", squares.join(", ")));
        }
        if analysis.incomplete {
            insights.push("Some lines are missing from this analysis.".to_string());
        }
        insights
    }
}
