//! Comparative analysis across candidate moves.
//!
//! One multi-PV search for the root, a restricted search for every requested
//! move outside the top lines, then board-derived metrics, classification and
//! motif flags per move. Inputs are never modified; each call builds a fresh
//! [`ComparativeAnalysis`].

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chess::{Board, ChessMove, Color, MoveGen};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classify::{classify_move, ClassificationBands, MoveClassification};
use crate::config::AnalysisConfig;
use crate::engine::{DepthOrTimeLimit, EvaluationSource, Evaluator, SearchOutcome, SearchRequest};
use crate::error::{AnalysisError, EngineError};
use crate::evaluation::Evaluation;
use crate::insights::InsightWriter;
use crate::metrics::{compute_weighted, MetricWeights, StrategicMetrics};
use crate::notation::{find_uci_move, resolve_move, san_for, ResolvedMove};
use crate::position::{CastlingRights, GamePhase, LastMove, Position};
use crate::spatial::{compute_space_control, compute_space_control_for, SpaceControlBoard};
use crate::tactics::{self, HangingPiece, TacticalMotif};
use crate::variation::Variation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub fen: String,
    /// Extra moves to score, in UCI or SAN
    #[serde(default)]
    pub candidate_moves: Vec<String>,
    /// The move actually played, if any
    #[serde(default)]
    pub played_move: Option<String>,
    pub multipv_count: u32,
    pub depth_or_time: DepthOrTimeLimit,
    #[serde(default)]
    pub last_move: Option<LastMove>,
}

impl AnalysisRequest {
    pub fn new(fen: &str, multipv_count: u32, depth_or_time: DepthOrTimeLimit) -> Self {
        Self {
            fen: fen.to_string(),
            candidate_moves: Vec::new(),
            played_move: None,
            multipv_count,
            depth_or_time,
            last_move: None,
        }
    }

    pub fn with_candidates<I, S>(mut self, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate_moves.extend(moves.into_iter().map(Into::into));
        self
    }

    pub fn with_played(mut self, mv: &str) -> Self {
        self.played_move = Some(mv.to_string());
        self
    }

    pub fn with_last_move(mut self, last_move: LastMove) -> Self {
        self.last_move = Some(last_move);
        self
    }
}

/// Where an entry's score came from. `Unanalyzable` entries carry no score
/// and must never be read as a zero-loss move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Live,
    Cache,
    Unanalyzable,
}

impl From<EvaluationSource> for EntrySource {
    fn from(source: EvaluationSource) -> Self {
        match source {
            EvaluationSource::Live => EntrySource::Live,
            EvaluationSource::Cache => EntrySource::Cache,
        }
    }
}

const RADAR_LIMIT: f64 = 2.0;

/// Change in the mover's own metrics caused by the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionImpact {
    pub material: i32,
    pub king_safety: i32,
    pub center_control: i32,
    pub development: i32,
    /// `None` when the move gives check and "as if" mobility is undefined
    pub mobility: Option<i32>,
    pub space_advantage: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadarProfile {
    pub material: f64,
    pub king_safety: f64,
    pub center_control: f64,
    pub development: f64,
    pub mobility: f64,
    pub space_advantage: f64,
}

impl PositionImpact {
    pub fn between(
        before: &StrategicMetrics,
        before_space: i32,
        after_board: &Board,
        mover: Color,
        weights: &MetricWeights,
    ) -> Self {
        let after = compute_weighted(after_board, weights);
        let after_space = compute_space_control_for(after_board, mover)
            .summary
            .space_advantage;
        let was = before.side(mover);
        let now = after.side(mover);

        Self {
            material: (now.material - after.side(!mover).material)
                - (was.material - before.side(!mover).material),
            king_safety: now.king_safety.score - was.king_safety.score,
            center_control: now.center.score - was.center.score,
            development: now.development as i32 - was.development as i32,
            mobility: now
                .mobility
                .zip(was.mobility)
                .map(|(n, w)| n as i32 - w as i32),
            space_advantage: after_space - before_space,
        }
    }

    /// Impact values scaled to roughly one unit per meaningful change and
    /// clamped to [-2, 2] for radar display.
    pub fn radar(&self) -> RadarProfile {
        let clamp = |v: f64| v.clamp(-RADAR_LIMIT, RADAR_LIMIT);
        RadarProfile {
            material: clamp(self.material as f64),
            king_safety: clamp(self.king_safety as f64 / 10.0),
            center_control: clamp(self.center_control as f64 / 10.0),
            development: clamp(self.development as f64),
            mobility: clamp(self.mobility.unwrap_or(0) as f64 / 10.0),
            space_advantage: clamp(self.space_advantage as f64 / 4.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveComparisonEntry {
    pub uci: String,
    pub san: String,
    pub is_best: bool,
    pub played: bool,
    pub requested: bool,
    /// Rank among the top lines; `None` for moves scored by a restricted search
    pub engine_rank: Option<u32>,
    pub variation: Option<Variation>,
    /// Side-to-move relative
    pub score: Option<Evaluation>,
    pub white_score: Option<Evaluation>,
    pub classification: Option<MoveClassification>,
    pub source: EntrySource,
    pub impact: PositionImpact,
    pub motifs: BTreeSet<TacticalMotif>,
}

impl MoveComparisonEntry {
    pub fn loss_cp(&self) -> Option<u32> {
        self.classification.map(|c| c.loss_cp)
    }

    pub fn is_analyzed(&self) -> bool {
        self.source != EntrySource::Unanalyzable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixCell {
    /// Shared with the best move
    Present,
    /// Present, but not among the best move's motifs
    Unique,
    /// The best move has it and this move does not
    Missed,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacticalMatrixRow {
    pub uci: String,
    pub san: String,
    pub cells: Vec<MatrixCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacticalMatrix {
    pub motifs: Vec<TacticalMotif>,
    pub rows: Vec<TacticalMatrixRow>,
}

impl TacticalMatrix {
    pub fn build(entries: &[MoveComparisonEntry]) -> Self {
        let motifs: Vec<TacticalMotif> = entries
            .iter()
            .flat_map(|e| e.motifs.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let empty = BTreeSet::new();
        let best = entries
            .iter()
            .find(|e| e.is_best)
            .map(|e| &e.motifs)
            .unwrap_or(&empty);

        let rows = entries
            .iter()
            .map(|entry| TacticalMatrixRow {
                uci: entry.uci.clone(),
                san: entry.san.clone(),
                cells: motifs
                    .iter()
                    .map(|m| match (entry.motifs.contains(m), best.contains(m)) {
                        (true, true) => MatrixCell::Present,
                        (true, false) => MatrixCell::Unique,
                        (false, true) => MatrixCell::Missed,
                        (false, false) => MatrixCell::Absent,
                    })
                    .collect(),
            })
            .collect();

        Self { motifs, rows }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Complete,
    /// Some lines or candidate scores are missing
    Partial,
    /// The root search failed after its retry
    Unanalyzable,
    /// Checkmate or stalemate; nothing to search
    NoLegalMoves,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativeAnalysis {
    pub position: Position,
    #[serde(with = "crate::position::serde_color")]
    pub side_to_move: Color,
    pub game_phase: GamePhase,
    pub castling: CastlingRights,
    pub metrics: StrategicMetrics,
    pub space_control: SpaceControlBoard,
    pub hanging_pieces: Vec<HangingPiece>,
    pub engine: String,
    pub limit: DepthOrTimeLimit,
    pub best_move: Option<ResolvedMove>,
    pub best_score: Option<Evaluation>,
    pub variations: Vec<Variation>,
    pub entries: Vec<MoveComparisonEntry>,
    pub tactical_matrix: TacticalMatrix,
    pub status: AnalysisStatus,
    pub incomplete: bool,
    pub insights: Vec<String>,
}

impl ComparativeAnalysis {
    pub fn entry(&self, uci: &str) -> Option<&MoveComparisonEntry> {
        self.entries.iter().find(|e| e.uci == uci)
    }

    pub fn played_entry(&self) -> Option<&MoveComparisonEntry> {
        self.entries.iter().find(|e| e.played)
    }

    pub fn best_entry(&self) -> Option<&MoveComparisonEntry> {
        self.entries.iter().find(|e| e.is_best)
    }
}

struct Candidate {
    resolved: ResolvedMove,
    played: bool,
}

/// Root data shared by every entry.
struct Root<'a> {
    board: Board,
    mover: Color,
    metrics: &'a StrategicMetrics,
    space_advantage: i32,
}

struct Scored {
    engine_rank: Option<u32>,
    variation: Option<Variation>,
    score: Option<Evaluation>,
    source: EntrySource,
}

impl Scored {
    fn unanalyzable() -> Self {
        Self {
            engine_rank: None,
            variation: None,
            score: None,
            source: EntrySource::Unanalyzable,
        }
    }
}

/// Orchestrates engine search, metrics, classification and motif detection.
pub struct ComparativeAnalyzer<E: Evaluator> {
    evaluator: E,
    bands: ClassificationBands,
    weights: MetricWeights,
    insights: Option<Box<dyn InsightWriter>>,
}

impl<E: Evaluator> ComparativeAnalyzer<E> {
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            bands: ClassificationBands::default(),
            weights: MetricWeights::default(),
            insights: None,
        }
    }

    pub fn from_config(evaluator: E, config: &AnalysisConfig) -> Self {
        Self::new(evaluator)
            .with_bands(config.bands)
            .with_weights(config.weights)
    }

    pub fn with_bands(mut self, bands: ClassificationBands) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_weights(mut self, weights: MetricWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_insights(mut self, writer: impl InsightWriter + 'static) -> Self {
        self.insights = Some(Box::new(writer));
        self
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<ComparativeAnalysis, AnalysisError> {
        if request.multipv_count == 0 {
            return Err(AnalysisError::InvalidMultiPv);
        }
        let last_move = request.last_move.clone().unwrap_or(LastMove::NoPriorMove);
        let position = Position::with_last_move(&request.fen, last_move)?;
        let board = *position.board();
        let mover = board.side_to_move();
        let candidates = resolve_candidates(position.fen(), request)?;

        let metrics = compute_weighted(&board, &self.weights);
        let space_control = compute_space_control(&board);
        let root = Root {
            board,
            mover,
            metrics: &metrics,
            space_advantage: space_control.summary.space_advantage,
        };

        let mut analysis = ComparativeAnalysis {
            position: position.clone(),
            side_to_move: mover,
            game_phase: GamePhase::of(&board),
            castling: CastlingRights::of(&board),
            metrics: metrics.clone(),
            space_control,
            hanging_pieces: tactics::hanging_pieces(&board),
            engine: self.evaluator.identity().to_string(),
            limit: request.depth_or_time,
            best_move: None,
            best_score: None,
            variations: Vec::new(),
            entries: Vec::new(),
            tactical_matrix: TacticalMatrix::default(),
            status: AnalysisStatus::Complete,
            incomplete: false,
            insights: Vec::new(),
        };

        if MoveGen::new_legal(&board).len() == 0 {
            analysis.status = AnalysisStatus::NoLegalMoves;
            return Ok(self.finish(analysis));
        }

        let search =
            SearchRequest::multipv(position.fen(), request.multipv_count, request.depth_or_time);
        let outcome = match self.evaluator.evaluate(&search).await {
            Ok(outcome) => outcome,
            Err(EngineError::Unanalyzable { reason, .. }) => {
                warn!(fen = %position.fen(), reason = %reason, "Root position unanalyzable");
                analysis.status = AnalysisStatus::Unanalyzable;
                analysis.incomplete = true;
                analysis.entries = candidates
                    .iter()
                    .filter_map(|c| self.entry(&root, c, true, Scored::unanalyzable()))
                    .collect();
                sort_entries(&mut analysis.entries);
                return Ok(self.finish(analysis));
            }
            Err(e) => return Err(e.into()),
        };

        let SearchOutcome {
            variations,
            best_move,
            source,
            incomplete,
            limit_used,
        } = outcome;
        let mut incomplete = incomplete;
        // Candidates are searched at the bound the root actually used, so a
        // retry at reduced depth keeps all scores comparable.
        analysis.limit = limit_used;

        let best_uci = variations
            .first()
            .and_then(|v| v.first_move())
            .map(str::to_string)
            .or(best_move);
        let best_score = variations.first().map(|v| v.score);

        let mut entries = Vec::new();
        for variation in &variations {
            let Some(uci) = variation.first_move() else {
                continue;
            };
            let candidate = match candidates.iter().find(|c| c.resolved.uci == uci) {
                Some(c) => Candidate {
                    resolved: c.resolved.clone(),
                    played: c.played,
                },
                None => Candidate {
                    resolved: ResolvedMove {
                        uci: uci.to_string(),
                        san: san_for(position.fen(), uci),
                    },
                    played: false,
                },
            };
            let requested = candidates.iter().any(|c| c.resolved.uci == uci);
            let scored = Scored {
                engine_rank: Some(variation.rank),
                variation: Some(variation.clone()),
                score: Some(variation.score),
                source: source.into(),
            };
            match self.entry(&root, &candidate, requested, scored) {
                Some(entry) => entries.push(entry),
                None => {
                    warn!(fen = %position.fen(), mv = uci, "Engine line starts with an illegal move");
                    incomplete = true;
                }
            }
        }

        for candidate in &candidates {
            if entries.iter().any(|e| e.uci == candidate.resolved.uci) {
                continue;
            }
            let single = SearchRequest::single_move(
                position.fen(),
                &candidate.resolved.uci,
                limit_used,
            );
            let scored = match self.evaluator.evaluate(&single).await {
                Ok(outcome) => {
                    incomplete |= outcome.incomplete;
                    let source = outcome.source.into();
                    match outcome.variations.into_iter().next() {
                        Some(variation) => Scored {
                            engine_rank: None,
                            score: Some(variation.score),
                            variation: Some(variation),
                            source,
                        },
                        None => {
                            incomplete = true;
                            Scored::unanalyzable()
                        }
                    }
                }
                Err(EngineError::Unanalyzable { reason, .. }) => {
                    warn!(mv = %candidate.resolved.uci, reason = %reason, "Candidate move unanalyzable");
                    incomplete = true;
                    Scored::unanalyzable()
                }
                Err(e) => return Err(e.into()),
            };
            if let Some(entry) = self.entry(&root, candidate, true, scored) {
                entries.push(entry);
            }
        }

        for entry in &mut entries {
            entry.is_best = best_uci.as_deref() == Some(entry.uci.as_str());
            entry.classification = match (entry.white_score, best_score, best_uci.as_deref()) {
                (Some(played), Some(best), Some(best_uci)) => Some(classify_move(
                    &entry.uci,
                    best_uci,
                    played,
                    best.relative_to(mover, Color::White),
                    mover,
                    &self.bands,
                )),
                _ => None,
            };
        }
        sort_entries(&mut entries);

        analysis.best_move = best_uci.map(|uci| ResolvedMove {
            san: san_for(position.fen(), &uci),
            uci,
        });
        analysis.best_score = best_score;
        analysis.variations = variations;
        analysis.entries = entries;
        analysis.incomplete = incomplete;
        if incomplete {
            analysis.status = AnalysisStatus::Partial;
        }

        info!(
            fen = %position.fen(),
            entries = analysis.entries.len(),
            status = ?analysis.status,
            "Comparative analysis complete"
        );
        Ok(self.finish(analysis))
    }

    fn entry(
        &self,
        root: &Root<'_>,
        candidate: &Candidate,
        requested: bool,
        scored: Scored,
    ) -> Option<MoveComparisonEntry> {
        let mv: ChessMove = find_uci_move(&root.board, &candidate.resolved.uci)?;
        let after = root.board.make_move_new(mv);

        Some(MoveComparisonEntry {
            uci: candidate.resolved.uci.clone(),
            san: candidate.resolved.san.clone(),
            is_best: false,
            played: candidate.played,
            requested,
            engine_rank: scored.engine_rank,
            variation: scored.variation,
            score: scored.score,
            white_score: scored.score.map(|s| s.relative_to(root.mover, Color::White)),
            classification: None,
            source: scored.source,
            impact: PositionImpact::between(
                root.metrics,
                root.space_advantage,
                &after,
                root.mover,
                &self.weights,
            ),
            motifs: tactics::detect(&root.board, mv),
        })
    }

    fn finish(&self, mut analysis: ComparativeAnalysis) -> ComparativeAnalysis {
        analysis.tactical_matrix = TacticalMatrix::build(&analysis.entries);
        if let Some(writer) = &self.insights {
            analysis.insights = writer.write(&analysis);
        }
        analysis
    }
}

/// Played move first, then requested alternatives, de-duplicated by UCI.
fn resolve_candidates(fen: &str, request: &AnalysisRequest) -> Result<Vec<Candidate>, AnalysisError> {
    let mut candidates: Vec<Candidate> = Vec::new();
    let played = request.played_move.iter().map(|m| (m, true));
    let others = request.candidate_moves.iter().map(|m| (m, false));

    for (text, is_played) in played.chain(others) {
        let resolved = resolve_move(fen, text)?;
        match candidates.iter_mut().find(|c| c.resolved.uci == resolved.uci) {
            Some(existing) => existing.played |= is_played,
            None => candidates.push(Candidate {
                resolved,
                played: is_played,
            }),
        }
    }
    Ok(candidates)
}

/// Best score first, then smaller loss, then SAN. Unscored entries go last.
fn compare_entries(a: &MoveComparisonEntry, b: &MoveComparisonEntry) -> Ordering {
    match (a.score, b.score) {
        (Some(sa), Some(sb)) => sb
            .cmp(&sa)
            .then_with(|| {
                let la = a.loss_cp().unwrap_or(u32::MAX);
                let lb = b.loss_cp().unwrap_or(u32::MAX);
                la.cmp(&lb)
            })
            .then_with(|| a.san.cmp(&b.san)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.san.cmp(&b.san),
    }
}

pub fn sort_entries(entries: &mut [MoveComparisonEntry]) {
    entries.sort_by(compare_entries);
}
