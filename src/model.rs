//! Data model shared by every stage of the pipeline.
//!
//! `RawItem` comes in from the fetcher, `TickerAggregate` goes out to the
//! presentation layer. Everything in between is derived and never mutated
//! after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScoreUnavailable;
use crate::justification::JustificationEntry;
use crate::suggestion::Suggestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceType {
    News,
    Social,
}

/// Unprocessed news/social item as produced by the fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub source_type: SourceType,
    pub source_name: String,
    /// URL for news, post id for social. Primary dedup key when present.
    #[serde(default)]
    pub url_or_id: Option<String>,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub body: Option<String>,
    pub published_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
}

/// Normalized, de-duplicated unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item_id: String,
    pub source_type: SourceType,
    pub source_name: String,
    pub url_or_id: Option<String>,
    pub headline: String,
    pub body: Option<String>,
    pub published_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
}

impl ScoredItem {
    /// Text handed to the chunker: headline, then the body on its own line.
    pub fn text(&self) -> String {
        match self.body.as_deref().filter(|b| !b.is_empty()) {
            Some(body) if self.headline.is_empty() => body.to_string(),
            Some(body) => format!("{}\n{}", self.headline, body),
            None => self.headline.clone(),
        }
    }

    pub fn has_body(&self) -> bool {
        self.body.as_deref().is_some_and(|b| !b.is_empty())
    }
}

/// Bounded-length slice of an item's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_index: usize,
    pub text: String,
    pub char_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Positive,
    Neutral,
    Negative,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Positive => "positive",
            Label::Neutral => "neutral",
            Label::Negative => "negative",
        }
    }
}

/// Scorer output for one chunk. `score` is signed: negative is bearish,
/// magnitude is confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub label: Label,
    pub score: f64,
}

impl ChunkResult {
    pub fn new(label: Label, score: f64) -> Self {
        Self {
            label,
            score: clamp_unit(score),
        }
    }

    /// Build from a classifier that reports `(label, confidence)` with an
    /// unsigned confidence. Neutral collapses to 0.0.
    pub fn from_classifier(label: &str, confidence: f64) -> Result<Self, ScoreUnavailable> {
        if !confidence.is_finite() {
            return Err(ScoreUnavailable::Model(format!(
                "non-finite confidence for label {label:?}"
            )));
        }
        let c = confidence.abs().min(1.0);
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" | "bullish" => Ok(Self::new(Label::Positive, c)),
            "negative" | "neg" | "bearish" => Ok(Self::new(Label::Negative, -c)),
            "neutral" | "neu" => Ok(Self::new(Label::Neutral, 0.0)),
            other => Err(ScoreUnavailable::Model(format!("unknown label {other:?}"))),
        }
    }
}

/// Per-item aggregate over its chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemScore {
    pub item_id: String,
    pub label: Label,
    pub score: f64,
    pub chunk_count: usize,
    pub failed_chunk_count: usize,
    pub published_at: DateTime<Utc>,
}

/// Which source types contributed scored items to an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataSource {
    News,
    Social,
    Combined,
    None,
}

impl DataSource {
    pub fn from_types<I: IntoIterator<Item = SourceType>>(types: I) -> Self {
        let (mut news, mut social) = (false, false);
        for t in types {
            match t {
                SourceType::News => news = true,
                SourceType::Social => social = true,
            }
        }
        match (news, social) {
            (true, true) => DataSource::Combined,
            (true, false) => DataSource::News,
            (false, true) => DataSource::Social,
            (false, false) => DataSource::None,
        }
    }
}

/// Per-ticker, per-run result. This is what gets persisted and displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerAggregate {
    pub ticker: String,
    /// `None` when no item scored (suggestion is then `NoData`).
    pub aggregated_score: Option<f64>,
    pub item_count: usize,
    pub failed_item_count: usize,
    pub empty_item_count: usize,
    pub duplicate_count: usize,
    pub irrelevant_count: usize,
    pub stale_item_count: usize,
    pub chunk_count: usize,
    pub failed_chunk_count: usize,
    pub data_source: DataSource,
    pub suggestion: Suggestion,
    #[serde(default)]
    pub justification: Vec<JustificationEntry>,
    pub computed_at: DateTime<Utc>,
}

impl TickerAggregate {
    /// State worth persisting. `NoData` runs produce none.
    pub fn state(&self) -> Option<SuggestionState> {
        let score = self.aggregated_score?;
        if !self.suggestion.is_level() {
            return None;
        }
        Some(SuggestionState {
            ticker: self.ticker.clone(),
            suggestion: self.suggestion,
            aggregated_score: score,
            computed_at: self.computed_at,
        })
    }
}

/// Last known suggestion for a ticker, owned by the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionState {
    pub ticker: String,
    pub suggestion: Suggestion,
    pub aggregated_score: f64,
    pub computed_at: DateTime<Utc>,
}

/// Canonical ticker key: trimmed, upper-case.
pub fn canonical_ticker(ticker: &str) -> String {
    ticker.trim().to_ascii_uppercase()
}

pub(crate) fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(-1.0, 1.0)
    }
}
