use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower_http::cors::CorsLayer;

use crate::engine::{RunOutcome, SentimentEngine};
use crate::error::EngineError;
use crate::model::{canonical_ticker, RawItem, SuggestionState};
use crate::store::StateStore;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SentimentEngine>,
    pub store: Arc<dyn StateStore>,
}

impl AppState {
    pub fn new(engine: SentimentEngine, store: Arc<dyn StateStore>) -> Self {
        Self {
            engine: Arc::new(engine),
            store,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/tickers/{ticker}/analyze", post(analyze))
        .route("/tickers/{ticker}/suggestion", get(suggestion))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Error body: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.1 }));
        (self.0, body).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Configuration(msg) => ApiError(StatusCode::BAD_REQUEST, msg),
            e @ EngineError::InvalidTicker(_) => ApiError(StatusCode::BAD_REQUEST, e.to_string()),
            EngineError::StateStore(err) => {
                tracing::error!(error = %format!("{err:#}"), "state store failure");
                ApiError(StatusCode::INTERNAL_SERVER_ERROR, "state store unavailable".into())
            }
        }
    }
}

async fn analyze(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Json(items): Json<Vec<RawItem>>,
) -> Result<Json<RunOutcome>, ApiError> {
    let outcome = state
        .engine
        .run(state.store.as_ref(), &ticker, items, Utc::now())
        .await?;
    Ok(Json(outcome))
}

async fn suggestion(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<SuggestionState>, ApiError> {
    let key = canonical_ticker(&ticker);
    let found = state
        .store
        .get_previous_suggestion(&key)
        .await
        .map_err(EngineError::StateStore)?;
    found.map(Json).ok_or_else(|| {
        ApiError(
            StatusCode::NOT_FOUND,
            format!("no suggestion stored for {key}"),
        )
    })
}
