//! Sentiment aggregation and suggestion engine.
//!
//! Turns already-fetched news/social items about a ticker into one of five
//! suggestion levels (or `NoData`) with supporting evidence, and flags level
//! changes against the last persisted suggestion.

pub mod aggregate;
pub mod api;
pub mod change_detector;
pub mod chunk_aggregate;
pub mod chunker;
pub mod config;
pub mod engine;
pub mod error;
pub mod justification;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod scorer;
pub mod store;
pub mod suggestion;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::config::EngineConfig;
pub use crate::engine::{RunOutcome, SentimentEngine};
pub use crate::error::{EngineError, EngineResult, ItemRejection, ScoreUnavailable};
pub use crate::model::{
    ChunkResult, DataSource, ItemScore, Label, RawItem, ScoredItem, SourceType, SuggestionState,
    TickerAggregate,
};
pub use crate::scorer::{DynScorer, Scorer};
pub use crate::store::{JsonFileStateStore, MemoryStateStore, StateStore};
pub use crate::suggestion::{Suggestion, Thresholds};
