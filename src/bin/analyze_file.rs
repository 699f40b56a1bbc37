//! One-shot analysis of a JSON file of raw items.
//!
//! Usage: `analyze_file <TICKER> <items.json> [--persist]`
//! Without `--persist` the run ignores stored state; with it, the prior
//! suggestion is read from and written to `state_dir`.

use anyhow::{bail, Context, Result};
use chrono::Utc;

use ticker_sentiment_engine::config::EngineConfig;
use ticker_sentiment_engine::model::RawItem;
use ticker_sentiment_engine::scorer::build_scorer;
use ticker_sentiment_engine::store::JsonFileStateStore;
use ticker_sentiment_engine::telemetry;
use ticker_sentiment_engine::SentimentEngine;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let persist = args.iter().any(|a| a == "--persist");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let [ticker, path] = positional.as_slice() else {
        bail!("usage: analyze_file <TICKER> <items.json> [--persist]");
    };

    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let items: Vec<RawItem> =
        serde_json::from_str(&raw).with_context(|| format!("parsing raw items from {path}"))?;

    let config = EngineConfig::load_default()?;
    let scorer = build_scorer(&config.scorer)?;
    let state_dir = config.state_dir.clone();
    let engine = SentimentEngine::new(config, scorer)?;

    let now = Utc::now();
    let out = if persist {
        let store = JsonFileStateStore::new(state_dir);
        serde_json::to_string_pretty(&engine.run(&store, ticker, items, now).await?)?
    } else {
        serde_json::to_string_pretty(&engine.analyze(ticker, items, None, now).await)?
    };
    println!("{out}");
    Ok(())
}
