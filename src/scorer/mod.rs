//! Scorer Adapter seam: the engine depends on `Scorer`, never on a concrete model.
//!
//! The scorer is a long-lived resource built once by the caller and injected
//! into the engine as `Arc<dyn Scorer>`. Implementations must be safe to call
//! concurrently.

pub mod http;
pub mod lexicon;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{ScorerConfig, ScorerKind};
use crate::error::ScoreUnavailable;
use crate::model::ChunkResult;

pub use http::HttpScorer;
pub use lexicon::LexiconScorer;

#[async_trait]
pub trait Scorer: Send + Sync {
    /// Classify one chunk of text.
    async fn score(&self, text: &str) -> Result<ChunkResult, ScoreUnavailable>;
    /// Scorer name for logs.
    fn name(&self) -> &'static str;
}

pub type DynScorer = Arc<dyn Scorer>;

/// Factory: build the configured scorer.
pub fn build_scorer(cfg: &ScorerConfig) -> anyhow::Result<DynScorer> {
    match cfg.kind {
        ScorerKind::Lexicon => Ok(Arc::new(LexiconScorer::new())),
        ScorerKind::Http => {
            let url = cfg
                .url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("scorer.url missing for http scorer"))?;
            Ok(Arc::new(HttpScorer::new(url, cfg.timeout())?))
        }
    }
}
