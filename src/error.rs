//! Error taxonomy for the engine.
//!
//! Only `EngineError` ever leaves a run. Per-chunk and per-item failures
//! (`ScoreUnavailable`, `ItemRejection`) are recovered where they happen and
//! rolled into counters on the aggregate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid thresholds, margins or limits. Raised at construction time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The ticker key is empty after trimming. A per-request error.
    #[error("invalid ticker: {0:?}")]
    InvalidTicker(String),

    /// The injected state store failed while reading or writing the prior suggestion.
    #[error("state store error: {0:#}")]
    StateStore(#[source] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Scorer failure for a single chunk.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreUnavailable {
    #[error("scorer timed out")]
    Timeout,

    #[error("model error: {0}")]
    Model(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("scoring task failed: {0}")]
    TaskFailed(String),
}

/// Why an item did not make it into the ticker aggregate.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRejection {
    #[error("item has neither headline nor body")]
    EmptyContent,

    #[error("all {chunk_count} chunks failed to score")]
    NoScorableChunks { chunk_count: usize },
}
