//! Sentiment engine service: Shuttle entrypoint.
//! Wires config, scorer, state store and metrics into the Axum router.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use ticker_sentiment_engine::api::{self, AppState};
use ticker_sentiment_engine::config::EngineConfig;
use ticker_sentiment_engine::metrics::Metrics;
use ticker_sentiment_engine::scorer::build_scorer;
use ticker_sentiment_engine::store::JsonFileStateStore;
use ticker_sentiment_engine::telemetry;
use ticker_sentiment_engine::SentimentEngine;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let config = EngineConfig::load_default()?;
    let scorer = build_scorer(&config.scorer)?;
    let store = Arc::new(JsonFileStateStore::new(config.state_dir.clone()));
    tracing::info!(
        scorer = scorer.name(),
        state_dir = %config.state_dir.display(),
        "starting sentiment engine"
    );

    let metrics = Metrics::init()?;
    let engine = SentimentEngine::new(config, scorer).map_err(anyhow::Error::from)?;

    let router = api::create_router(AppState::new(engine, store)).merge(metrics.router());
    Ok(router.into())
}
