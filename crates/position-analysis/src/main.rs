//! Analyze one position from the command line and print the result as JSON.
//!
//! Usage:
//!   analyze-position "<FEN>" [--moves e4,d4] [--played Nf3] [--multipv 3]
//!                    [--depth 18 | --movetime 2000]
//!
//! Engine settings come from ENGINE_* variables (or a .env file).

use std::sync::Arc;

use anyhow::{anyhow, bail};
use tracing::info;

use position_analysis::{
    AnalysisConfig, AnalysisRequest, ComparativeAnalyzer, DepthOrTimeLimit, EngineEvaluator,
    EnginePool, InMemoryCache, RuleInsights,
};

struct CliArgs {
    fen: String,
    moves: Vec<String>,
    played: Option<String>,
    multipv: Option<u32>,
    limit: Option<DepthOrTimeLimit>,
}

fn parse_args(args: &[String]) -> anyhow::Result<CliArgs> {
    let mut fen = None;
    let mut moves = Vec::new();
    let mut played = None;
    let mut multipv = None;
    let mut limit = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{name} needs a value"))
        };
        match arg.as_str() {
            "--moves" => {
                moves = value("--moves")?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "--played" => played = Some(value("--played")?),
            "--multipv" => multipv = Some(value("--multipv")?.parse()?),
            "--depth" => limit = Some(DepthOrTimeLimit::Depth(value("--depth")?.parse()?)),
            "--movetime" => {
                limit = Some(DepthOrTimeLimit::MoveTimeMs(value("--movetime")?.parse()?))
            }
            other if other.starts_with("--") => bail!("unknown option {other}"),
            other => {
                if fen.replace(other.to_string()).is_some() {
                    bail!("only one FEN may be given");
                }
            }
        }
    }

    Ok(CliArgs {
        fen: fen.ok_or_else(|| anyhow!("usage: analyze-position <FEN> [options]"))?,
        moves,
        played,
        multipv,
        limit,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;
    let config = AnalysisConfig::from_env()?;

    let pool = Arc::new(EnginePool::start(config.engine.clone()).await?);
    info!(engine = pool.identity(), "Engine pool ready");

    let evaluator = EngineEvaluator::new(pool.clone()).with_cache(Arc::new(InMemoryCache::new()));
    let analyzer = ComparativeAnalyzer::from_config(evaluator, &config).with_insights(RuleInsights);

    let mut request = AnalysisRequest::new(
        &cli.fen,
        cli.multipv.unwrap_or(config.multipv),
        cli.limit.unwrap_or(config.limit),
    )
    .with_candidates(cli.moves);
    if let Some(played) = &cli.played {
        request = request.with_played(played);
    }

    let result = analyzer.analyze(&request).await;
    pool.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}
