//! Position analysis: engine-backed comparison of candidate moves with
//! board-derived metrics, spatial control and tactical motifs.

pub use chess;

pub mod board_utils;
pub mod cache;
pub mod classify;
pub mod comparison;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod insights;
pub mod metrics;
pub mod notation;
pub mod position;
pub mod spatial;
pub mod tactics;
pub mod variation;

pub use cache::{AnalysisCache, CacheKey, CachedResult, InMemoryCache};
pub use classify::{ClassificationBands, MoveClassification, MoveQuality};
pub use comparison::{
    AnalysisRequest, AnalysisStatus, ComparativeAnalysis, ComparativeAnalyzer, EntrySource,
    MoveComparisonEntry, PositionImpact, TacticalMatrix,
};
pub use config::{AnalysisConfig, EngineConfig};
pub use engine::{
    DepthOrTimeLimit, EngineEvaluator, EnginePool, Evaluator, ScriptedEvaluator, SearchOutcome,
    SearchRequest,
};
pub use error::{AnalysisError, EngineError};
pub use evaluation::Evaluation;
pub use insights::{InsightWriter, RuleInsights};
pub use position::{LastMove, Position};
pub use variation::Variation;
