//! # Sentiment Engine
//! Orchestrates one analysis run for one ticker:
//! normalize → drop stale → chunk → score (bounded, concurrent) → chunk
//! aggregate → ticker aggregate → suggestion → {justification, change}.
//!
//! Per-chunk and per-item failures are recovered and counted; only an
//! invalid configuration or a failing state store surfaces as an error.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::aggregate::TickerAggregator;
use crate::change_detector::{self, ChangeSignal};
use crate::chunk_aggregate::{aggregate_item, ChunkOutcome};
use crate::chunker::Chunker;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, ScoreUnavailable};
use crate::justification::{select_justification, Evidence};
use crate::metrics as m;
use crate::model::{
    canonical_ticker, Chunk, DataSource, ItemScore, RawItem, ScoredItem, SuggestionState,
    TickerAggregate,
};
use crate::normalize::Normalizer;
use crate::scorer::DynScorer;
use crate::store::StateStore;
use crate::suggestion::SuggestionMapper;

/// Result of a persisted run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub aggregate: TickerAggregate,
    pub change: ChangeSignal,
}

pub struct SentimentEngine {
    config: EngineConfig,
    scorer: DynScorer,
    chunker: Chunker,
    mapper: SuggestionMapper,
    aggregator: TickerAggregator,
    /// Shared by every run so the limit holds across concurrent callers.
    permits: Arc<Semaphore>,
}

impl SentimentEngine {
    /// Validates the configuration up front; an invalid one never reaches a run.
    pub fn new(config: EngineConfig, scorer: DynScorer) -> EngineResult<Self> {
        config.validate()?;
        m::ensure_metrics_described();
        Ok(Self {
            chunker: Chunker::new(config.chunker.max_chunk_chars),
            mapper: SuggestionMapper::new(config.thresholds, config.hysteresis_margin),
            aggregator: TickerAggregator::new(&config.decay),
            permits: Arc::new(Semaphore::new(config.scorer.concurrency)),
            config,
            scorer,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Pure analysis: no state store access. `previous` feeds hysteresis only.
    pub async fn analyze(
        &self,
        ticker: &str,
        items: Vec<RawItem>,
        previous: Option<&SuggestionState>,
        now: DateTime<Utc>,
    ) -> TickerAggregate {
        let started = Instant::now();
        let ticker = canonical_ticker(ticker);
        counter!(m::ITEMS_TOTAL).increment(items.len() as u64);

        let report = Normalizer::new(&self.config.normalizer, &ticker).normalize(items);
        counter!(m::ITEMS_EMPTY_TOTAL).increment(report.empty_count as u64);
        counter!(m::ITEMS_DUPLICATE_TOTAL).increment(report.duplicate_count as u64);
        counter!(m::ITEMS_IRRELEVANT_TOTAL).increment(report.irrelevant_count as u64);

        let (fresh, stale): (Vec<ScoredItem>, Vec<ScoredItem>) = report
            .items
            .into_iter()
            .partition(|it| self.aggregator.within_window(it.published_at, now));
        if !stale.is_empty() {
            debug!(%ticker, stale = stale.len(), "dropping items past the decay cutoff");
        }

        let chunked: Vec<(ScoredItem, Vec<Chunk>)> = fresh
            .into_iter()
            .map(|it| {
                let chunks = self.chunker.chunk_item(&it).collect();
                (it, chunks)
            })
            .collect();

        let outcomes = self.score_chunks(&ticker, &chunked).await;

        let mut item_scores: Vec<ItemScore> = Vec::with_capacity(chunked.len());
        let mut failed_item_count = 0usize;
        let mut chunk_count = 0usize;
        let mut failed_chunk_count = 0usize;
        for ((item, _), item_outcomes) in chunked.iter().zip(outcomes) {
            chunk_count += item_outcomes.len();
            failed_chunk_count += item_outcomes.iter().filter(|o| o.result.is_err()).count();
            match aggregate_item(
                &item.item_id,
                item.published_at,
                &item_outcomes,
                self.mapper.thresholds(),
            ) {
                Ok(score) => {
                    debug!(%ticker, item_id = %score.item_id, score = score.score, label = score.label.as_str(), "item scored");
                    item_scores.push(score);
                }
                Err(rejection) => {
                    warn!(%ticker, item_id = %item.item_id, %rejection, "item excluded");
                    failed_item_count += 1;
                }
            }
        }

        let ticker_score = self.aggregator.aggregate(&item_scores, now);
        let suggestion = self.mapper.map(ticker_score.aggregated_score, previous);

        let by_id: HashMap<&str, &ScoredItem> = chunked
            .iter()
            .map(|(it, _)| (it.item_id.as_str(), it))
            .collect();
        let evidence: Vec<Evidence<'_>> = item_scores
            .iter()
            .filter_map(|s| by_id.get(s.item_id.as_str()).copied().map(|item| Evidence { item, score: s }))
            .collect();
        let data_source = DataSource::from_types(evidence.iter().map(|e| e.item.source_type));
        let justification = if suggestion.is_level() {
            select_justification(
                &evidence,
                suggestion,
                self.config.justification_count,
                self.mapper.thresholds(),
            )
        } else {
            Vec::new()
        };

        let stale_item_count = stale.len() + ticker_score.stale_count;
        counter!(m::ITEMS_STALE_TOTAL).increment(stale_item_count as u64);
        counter!(m::ITEMS_FAILED_TOTAL).increment(failed_item_count as u64);
        counter!(m::CHUNKS_SCORED_TOTAL).increment((chunk_count - failed_chunk_count) as u64);
        counter!(m::CHUNKS_FAILED_TOTAL).increment(failed_chunk_count as u64);
        if let Some(score) = ticker_score.aggregated_score {
            gauge!(m::LAST_SCORE, "ticker" => ticker.clone()).set(score);
        }
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!(m::RUN_MS).record(elapsed_ms);

        info!(
            %ticker,
            scorer = self.scorer.name(),
            %suggestion,
            score = ?ticker_score.aggregated_score,
            items = ticker_score.item_count,
            failed_items = failed_item_count,
            empty = report.empty_count,
            duplicates = report.duplicate_count,
            irrelevant = report.irrelevant_count,
            stale = stale_item_count,
            elapsed_ms,
            "analysis run finished"
        );

        TickerAggregate {
            ticker,
            aggregated_score: ticker_score.aggregated_score,
            item_count: ticker_score.item_count,
            failed_item_count,
            empty_item_count: report.empty_count,
            duplicate_count: report.duplicate_count,
            irrelevant_count: report.irrelevant_count,
            stale_item_count,
            chunk_count,
            failed_chunk_count,
            data_source,
            suggestion,
            justification,
            computed_at: now,
        }
    }

    /// Full run against a state store: read the prior once, analyze, detect
    /// the change, write the new state once. `NoData` leaves the store untouched.
    pub async fn run<S>(
        &self,
        store: &S,
        ticker: &str,
        items: Vec<RawItem>,
        now: DateTime<Utc>,
    ) -> EngineResult<RunOutcome>
    where
        S: StateStore + ?Sized,
    {
        let key = canonical_ticker(ticker);
        if key.is_empty() {
            return Err(EngineError::InvalidTicker(ticker.to_string()));
        }

        let previous = store
            .get_previous_suggestion(&key)
            .await
            .map_err(EngineError::StateStore)?;

        let aggregate = self.analyze(&key, items, previous.as_ref(), now).await;
        let change = change_detector::detect(previous.as_ref(), aggregate.suggestion);
        if change.alert {
            counter!(m::ALERTS_TOTAL).increment(1);
        }

        if let Some(state) = aggregate.state() {
            store
                .put_suggestion(&key, state)
                .await
                .map_err(EngineError::StateStore)?;
        }

        Ok(RunOutcome { aggregate, change })
    }

    /// Scores every chunk under the engine-wide concurrency limit. Each call gets its own
    /// timeout; panics and timeouts become `ScoreUnavailable`. Output keeps the
    /// item/chunk order of the input.
    async fn score_chunks(
        &self,
        ticker: &str,
        chunked: &[(ScoredItem, Vec<Chunk>)],
    ) -> Vec<Vec<ChunkOutcome>> {
        let timeout = self.config.scorer.timeout();

        let mut handles = Vec::with_capacity(chunked.len());
        for (item, chunks) in chunked {
            let mut item_handles = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                let sem = Arc::clone(&self.permits);
                let scorer = Arc::clone(&self.scorer);
                let text = chunk.text.clone();
                item_handles.push(tokio::spawn(async move {
                    let Ok(_permit) = sem.acquire_owned().await else {
                        return Err(ScoreUnavailable::TaskFailed("scorer pool closed".into()));
                    };
                    match tokio::time::timeout(timeout, scorer.score(&text)).await {
                        Ok(result) => result,
                        Err(_) => Err(ScoreUnavailable::Timeout),
                    }
                }));
            }
            handles.push((item.item_id.as_str(), chunks, item_handles));
        }

        let mut out = Vec::with_capacity(handles.len());
        for (item_id, chunks, item_handles) in handles {
            let mut outcomes = Vec::with_capacity(chunks.len());
            for (chunk, handle) in chunks.iter().zip(item_handles) {
                let result = match handle.await {
                    Ok(Ok(r)) if r.score.is_finite() => Ok(r),
                    Ok(Ok(r)) => Err(ScoreUnavailable::Model(format!(
                        "non-finite score {}",
                        r.score
                    ))),
                    Ok(Err(e)) => Err(e),
                    Err(join) => Err(ScoreUnavailable::TaskFailed(join.to_string())),
                };
                if let Err(e) = &result {
                    warn!(
                        %ticker,
                        %item_id,
                        chunk_index = chunk.chunk_index,
                        scorer = self.scorer.name(),
                        error = %e,
                        "chunk not scored"
                    );
                }
                outcomes.push(ChunkOutcome {
                    chunk_index: chunk.chunk_index,
                    char_length: chunk.char_length,
                    result,
                });
            }
            out.push(outcomes);
        }
        out
    }
}
