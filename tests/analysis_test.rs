//! Integration tests: comparative analysis end to end through the engine pool.

#![cfg(unix)]

mod common;

use std::sync::Arc;

use chess::{Color, Square};
use common::{FakeEngine, FakeMode};
use position_analysis::classify::MoveQuality;
use position_analysis::spatial::ControlLabel;
use position_analysis::{
    AnalysisRequest, AnalysisStatus, ComparativeAnalyzer, DepthOrTimeLimit, EngineEvaluator,
    EnginePool, EntrySource, InMemoryCache, RuleInsights,
};
use std::str::FromStr;

const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const LIMIT: DepthOrTimeLimit = DepthOrTimeLimit::Depth(10);

async fn analyzer(engine: &FakeEngine) -> ComparativeAnalyzer<EngineEvaluator> {
    let pool = EnginePool::start(engine.config()).await.expect("fake engine starts");
    let evaluator =
        EngineEvaluator::new(Arc::new(pool)).with_cache(Arc::new(InMemoryCache::new()));
    ComparativeAnalyzer::new(evaluator).with_insights(RuleInsights)
}

#[tokio::test]
async fn test_start_position_scenario() {
    let engine = FakeEngine::new(FakeMode::Normal);
    let analyzer = analyzer(&engine).await;
    let analysis = analyzer
        .analyze(&AnalysisRequest::new(START, 3, LIMIT))
        .await
        .unwrap();

    assert_eq!(analysis.status, AnalysisStatus::Complete);
    assert_eq!(analysis.side_to_move, Color::White);
    assert_eq!(analysis.metrics.material_diff(), 0);
    assert_eq!(analysis.metrics.white.mobility, Some(20));
    assert_eq!(analysis.metrics.black.mobility, Some(20));
    for sq in ["d4", "d5", "e4", "e5"] {
        let square = Square::from_str(sq).unwrap();
        assert_eq!(analysis.space_control.label(square), ControlLabel::Neutral, "{sq}");
    }

    assert_eq!(analysis.variations.len(), 3);
    let ranks: Vec<u32> = analysis.variations.iter().map(|v| v.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert!(analysis.variations[0].score >= analysis.variations[1].score);
    assert!(analysis.variations[1].score >= analysis.variations[2].score);
    assert!(analysis.hanging_pieces.is_empty());
    assert!(!analysis.insights.is_empty());
}

#[tokio::test]
async fn test_candidate_outside_top_lines_gets_own_search() {
    let engine = FakeEngine::new(FakeMode::Normal);
    let analyzer = analyzer(&engine).await;
    let request = AnalysisRequest::new(START, 3, LIMIT)
        .with_candidates(["a3"])
        .with_played("e2e4");
    let analysis = analyzer.analyze(&request).await.unwrap();

    assert_eq!(analysis.entries.len(), 4);
    let a3 = analysis.entry("a2a3").unwrap();
    assert_eq!(a3.engine_rank, None);
    assert!(a3.requested);
    assert_eq!(a3.source, EntrySource::Live);
    let c = a3.classification.unwrap();
    assert_eq!(c.loss_cp, 50);
    assert_eq!(c.quality, MoveQuality::Okay);

    // Worst score sorts last
    assert_eq!(analysis.entries.last().map(|e| e.uci.as_str()), Some("a2a3"));

    let played = analysis.played_entry().unwrap();
    assert!(played.is_best);
    assert_eq!(played.engine_rank, Some(1));
    assert_eq!(played.classification.unwrap().quality, MoveQuality::Excellent);
}

#[tokio::test]
async fn test_repeat_analysis_is_served_from_cache() {
    let engine = FakeEngine::new(FakeMode::Normal);
    let analyzer = analyzer(&engine).await;
    let request = AnalysisRequest::new(START, 2, LIMIT).with_candidates(["h2h3"]);

    let first = analyzer.analyze(&request).await.unwrap();
    let second = analyzer.analyze(&request).await.unwrap();

    assert!(first.entries.iter().all(|e| e.source == EntrySource::Live));
    assert!(second.entries.iter().all(|e| e.source == EntrySource::Cache));
    let losses = |a: &position_analysis::ComparativeAnalysis| {
        a.entries.iter().map(|e| e.loss_cp()).collect::<Vec<_>>()
    };
    assert_eq!(losses(&first), losses(&second));
}

#[tokio::test]
async fn test_hung_engine_leaves_entries_unanalyzable() {
    let engine = FakeEngine::new(FakeMode::Hang);
    let pool = EnginePool::start(position_analysis::EngineConfig {
        request_timeout: std::time::Duration::from_millis(200),
        ..engine.config()
    })
    .await
    .unwrap();
    let analyzer = ComparativeAnalyzer::new(EngineEvaluator::new(Arc::new(pool)));

    let request = AnalysisRequest::new(START, 3, LIMIT).with_played("Nf3");
    let analysis = analyzer.analyze(&request).await.unwrap();

    assert_eq!(analysis.status, AnalysisStatus::Unanalyzable);
    assert!(analysis.incomplete);
    let played = analysis.played_entry().unwrap();
    assert_eq!(played.uci, "g1f3");
    assert_eq!(played.source, EntrySource::Unanalyzable);
    assert!(played.classification.is_none());
}

#[tokio::test]
async fn test_json_output_round_trips() {
    let engine = FakeEngine::new(FakeMode::Normal);
    let analyzer = analyzer(&engine).await;
    let analysis = analyzer
        .analyze(&AnalysisRequest::new(START, 1, LIMIT).with_played("d4"))
        .await
        .unwrap();

    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["side_to_move"], "white");
    assert_eq!(json["status"], "complete");
    assert_eq!(json["space_control"]["squares"].as_array().map(Vec::len), Some(64));

    let back: position_analysis::ComparativeAnalysis = serde_json::from_value(json).unwrap();
    assert_eq!(back.entries, analysis.entries);
}
