//! Integration tests: engine pool lifecycle against fake UCI engines.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeEngine, FakeMode, FAKE_ENGINE_NAME};
use position_analysis::engine::EvaluationSource;
use position_analysis::{
    DepthOrTimeLimit, EngineConfig, EngineError, EngineEvaluator, EnginePool, Evaluator,
    InMemoryCache, SearchRequest,
};

const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

async fn evaluator(engine: &FakeEngine, config: EngineConfig) -> EngineEvaluator {
    let pool = EnginePool::start(config).await.expect("fake engine starts");
    assert!(engine.config().path.exists());
    EngineEvaluator::new(Arc::new(pool))
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_binary_is_unavailable() {
    let config = EngineConfig::with_path("/nonexistent/path/to/engine");
    match EnginePool::start(config).await {
        Err(EngineError::EngineUnavailable(msg)) => assert!(msg.contains("failed to spawn")),
        Err(other) => panic!("expected EngineUnavailable, got {other:?}"),
        Ok(_) => panic!("pool started without an engine"),
    }
}

#[tokio::test]
async fn test_handshake_reads_identity() {
    let engine = FakeEngine::new(FakeMode::Normal);
    let pool = EnginePool::start(engine.config()).await.unwrap();
    assert_eq!(pool.identity(), FAKE_ENGINE_NAME);
    assert_eq!(pool.idle_count(), 1);
    pool.shutdown().await;
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(engine.log(), vec!["quit".to_string()]);
}

// ---------------------------------------------------------------------------
// Searches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_multipv_search() {
    let engine = FakeEngine::new(FakeMode::Normal);
    let evaluator = evaluator(&engine, engine.config()).await;

    let request = SearchRequest::multipv(START, 3, DepthOrTimeLimit::Depth(10));
    let outcome = evaluator.evaluate(&request).await.unwrap();

    assert_eq!(outcome.variations.len(), 3);
    let firsts: Vec<&str> = outcome
        .variations
        .iter()
        .filter_map(|v| v.first_move())
        .collect();
    assert_eq!(firsts, vec!["e2e4", "d2d4", "g1f3"]);
    assert_eq!(outcome.best_move.as_deref(), Some("e2e4"));
    assert_eq!(outcome.source, EvaluationSource::Live);
    assert!(!outcome.incomplete);
    assert_eq!(evaluator.pool().idle_count(), 1);
}

#[tokio::test]
async fn test_single_move_search() {
    let engine = FakeEngine::new(FakeMode::Normal);
    let evaluator = evaluator(&engine, engine.config()).await;

    let request = SearchRequest::single_move(START, "a2a3", DepthOrTimeLimit::Depth(10));
    let outcome = evaluator.evaluate(&request).await.unwrap();

    assert_eq!(outcome.variations.len(), 1);
    assert_eq!(outcome.variations[0].first_move(), Some("a2a3"));
}

#[tokio::test]
async fn test_invalid_fen_is_rejected_before_search() {
    let engine = FakeEngine::new(FakeMode::Normal);
    let evaluator = evaluator(&engine, engine.config()).await;

    let request = SearchRequest::multipv("8/8/8 w - - 0 1", 1, DepthOrTimeLimit::Depth(10));
    assert!(matches!(
        evaluator.evaluate(&request).await,
        Err(EngineError::InvalidPosition(_))
    ));
}

#[tokio::test]
async fn test_second_request_hits_cache() {
    let engine = FakeEngine::new(FakeMode::Normal);
    let cache = Arc::new(InMemoryCache::new());
    let evaluator = evaluator(&engine, engine.config())
        .await
        .with_cache(cache.clone());

    let request = SearchRequest::multipv(START, 2, DepthOrTimeLimit::Depth(10));
    let live = evaluator.evaluate(&request).await.unwrap();
    let cached = evaluator.evaluate(&request).await.unwrap();

    assert_eq!(live.source, EvaluationSource::Live);
    assert_eq!(cached.source, EvaluationSource::Cache);
    assert_eq!(live.variations, cached.variations);
    assert_eq!(cache.len(), 1);

    // A different bound is a different key
    let deeper = SearchRequest::multipv(START, 2, DepthOrTimeLimit::Depth(12));
    assert_eq!(
        evaluator.evaluate(&deeper).await.unwrap().source,
        EvaluationSource::Live
    );
}

#[tokio::test]
async fn test_concurrent_requests_share_pool() {
    let engine = FakeEngine::new(FakeMode::Normal);
    let config = EngineConfig {
        pool_size: 2,
        ..engine.config()
    };
    let evaluator = evaluator(&engine, config).await;

    let a = SearchRequest::multipv(START, 1, DepthOrTimeLimit::Depth(10));
    let b = SearchRequest::multipv(START, 3, DepthOrTimeLimit::Depth(10));
    let (ra, rb) = tokio::join!(evaluator.evaluate(&a), evaluator.evaluate(&b));

    assert_eq!(ra.unwrap().variations.len(), 1);
    assert_eq!(rb.unwrap().variations.len(), 3);
    assert!(evaluator.pool().idle_count() <= 2);
}

#[tokio::test]
async fn test_single_engine_serves_one_request_at_a_time() {
    let engine = FakeEngine::new(FakeMode::Slow);
    let config = EngineConfig {
        pool_size: 1,
        ..engine.config()
    };
    let evaluator = evaluator(&engine, config).await;

    let a = SearchRequest::multipv(START, 1, DepthOrTimeLimit::Depth(10));
    let b = SearchRequest::multipv(START, 2, DepthOrTimeLimit::Depth(10));
    let c = SearchRequest::single_move(START, "a2a3", DepthOrTimeLimit::Depth(10));
    let (ra, rb, rc) = tokio::join!(
        evaluator.evaluate(&a),
        evaluator.evaluate(&b),
        evaluator.evaluate(&c)
    );

    assert_eq!(ra.unwrap().variations.len(), 1);
    assert_eq!(rb.unwrap().variations.len(), 2);
    assert_eq!(rc.unwrap().variations[0].first_move(), Some("a2a3"));
    assert_eq!(
        engine.log(),
        vec!["begin", "end", "begin", "end", "begin", "end"]
    );
    assert_eq!(evaluator.pool().idle_count(), 1);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_hung_engine_becomes_unanalyzable() {
    let engine = FakeEngine::new(FakeMode::Hang);
    let config = EngineConfig {
        request_timeout: Duration::from_millis(300),
        ..engine.config()
    };
    let evaluator = evaluator(&engine, config).await;

    let request = SearchRequest::multipv(START, 3, DepthOrTimeLimit::Depth(10));
    match evaluator.evaluate(&request).await {
        Err(EngineError::Unanalyzable { fen, reason }) => {
            assert_eq!(fen, START);
            assert!(reason.contains("timed out"), "reason: {reason}");
        }
        other => panic!("expected Unanalyzable, got {other:?}"),
    }
    // Both timed-out processes were discarded rather than reused
    assert_eq!(evaluator.pool().idle_count(), 0);
}

#[tokio::test]
async fn test_pool_recovers_after_unanalyzable_position() {
    let engine = FakeEngine::new(FakeMode::HangTwice);
    let config = EngineConfig {
        request_timeout: Duration::from_millis(300),
        ..engine.config()
    };
    let evaluator = evaluator(&engine, config).await;

    let request = SearchRequest::multipv(START, 2, DepthOrTimeLimit::Depth(10));
    assert!(matches!(
        evaluator.evaluate(&request).await,
        Err(EngineError::Unanalyzable { .. })
    ));
    assert_eq!(evaluator.pool().idle_count(), 0);

    // A fresh process is spawned for the next request
    let outcome = evaluator.evaluate(&request).await.unwrap();
    assert_eq!(outcome.variations.len(), 2);
    assert_eq!(outcome.limit_used, DepthOrTimeLimit::Depth(10));
    assert_eq!(evaluator.pool().idle_count(), 1);
}

#[tokio::test]
async fn test_crashed_engine_is_respawned() {
    let engine = FakeEngine::new(FakeMode::CrashOnce);
    let evaluator = evaluator(&engine, engine.config()).await;

    let request = SearchRequest::multipv(START, 2, DepthOrTimeLimit::Depth(10));
    let outcome = evaluator.evaluate(&request).await.unwrap();

    assert!(engine.crashed());
    assert_eq!(outcome.variations.len(), 2);
    assert_eq!(outcome.limit_used, DepthOrTimeLimit::Depth(5));
    assert_eq!(evaluator.pool().idle_count(), 1);
}

#[tokio::test]
async fn test_shutdown_refuses_new_requests() {
    let engine = FakeEngine::new(FakeMode::Normal);
    let evaluator = evaluator(&engine, engine.config()).await;
    evaluator.pool().shutdown().await;

    let request = SearchRequest::multipv(START, 1, DepthOrTimeLimit::Depth(10));
    assert!(matches!(
        evaluator.evaluate(&request).await,
        Err(EngineError::PoolClosed)
    ));
}
