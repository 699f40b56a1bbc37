//! # Chunk Aggregator
//! Reduces the chunk results of one item into a single `ItemScore`.
//!
//! Score is the length-weighted mean of the successful chunks. The label is
//! re-derived from that score with the suggestion neutral band, not voted
//! from chunk labels.

use chrono::{DateTime, Utc};

use crate::error::{ItemRejection, ScoreUnavailable};
use crate::model::{clamp_unit, ChunkResult, ItemScore};
use crate::suggestion::Thresholds;

/// Scoring outcome for a single chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOutcome {
    pub chunk_index: usize,
    pub char_length: usize,
    pub result: Result<ChunkResult, ScoreUnavailable>,
}

pub fn aggregate_item(
    item_id: &str,
    published_at: DateTime<Utc>,
    outcomes: &[ChunkOutcome],
    thresholds: &Thresholds,
) -> Result<ItemScore, ItemRejection> {
    let mut weighted = 0.0f64;
    let mut weight = 0.0f64;
    let mut ok = 0usize;

    for o in outcomes {
        if let Ok(r) = &o.result {
            let w = o.char_length as f64;
            weighted += r.score * w;
            weight += w;
            ok += 1;
        }
    }

    if ok == 0 {
        return Err(ItemRejection::NoScorableChunks {
            chunk_count: outcomes.len(),
        });
    }

    let score = if weight > 0.0 {
        clamp_unit(weighted / weight)
    } else {
        // zero-length chunks only: plain mean
        let sum: f64 = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|r| r.score)
            .sum();
        clamp_unit(sum / ok as f64)
    };

    Ok(ItemScore {
        item_id: item_id.to_string(),
        label: thresholds.label_for(score),
        score,
        chunk_count: outcomes.len(),
        failed_chunk_count: outcomes.len() - ok,
        published_at,
    })
}
