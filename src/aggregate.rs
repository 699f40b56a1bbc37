//! # Ticker Aggregator
//! Recency-weighted mean of item scores for one ticker.
//!
//! weight = 0.5 ^ (age_hours / half_life_hours); items older than the
//! cutoff (`cutoff_half_lives` half-lives) are dropped, not down-weighted.
//! The combine step is a plain (weighted sum, weight sum) pair, so partial
//! accumulators can be merged in any order.

use chrono::{DateTime, Utc};

use crate::config::DecayConfig;
use crate::model::{clamp_unit, ItemScore};

/// Mergeable partial aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecayAccumulator {
    pub weighted_sum: f64,
    pub weight_sum: f64,
    pub count: usize,
}

impl DecayAccumulator {
    pub fn push(&mut self, score: f64, weight: f64) {
        self.weighted_sum += score * weight;
        self.weight_sum += weight;
        self.count += 1;
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            weighted_sum: self.weighted_sum + other.weighted_sum,
            weight_sum: self.weight_sum + other.weight_sum,
            count: self.count + other.count,
        }
    }

    /// `None` when nothing contributed.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 || self.weight_sum <= 0.0 {
            return None;
        }
        Some(clamp_unit(self.weighted_sum / self.weight_sum))
    }
}

/// Result of aggregating one ticker's item scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickerScore {
    pub aggregated_score: Option<f64>,
    pub item_count: usize,
    pub stale_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct TickerAggregator {
    half_life_hours: f64,
    cutoff_hours: f64,
}

impl TickerAggregator {
    pub fn new(cfg: &DecayConfig) -> Self {
        Self {
            half_life_hours: cfg.half_life_hours,
            cutoff_hours: cfg.cutoff_hours(),
        }
    }

    /// Age in hours; items from the future count as fresh.
    pub fn age_hours(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let secs = (now - published_at).num_milliseconds() as f64 / 1000.0;
        (secs / 3600.0).max(0.0)
    }

    pub fn recency_weight(&self, age_hours: f64) -> f64 {
        0.5f64.powf(age_hours / self.half_life_hours)
    }

    pub fn within_window(&self, published_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        Self::age_hours(published_at, now) <= self.cutoff_hours
    }

    /// Weight for one item, or `None` if it fell out of the window.
    pub fn weight_for(&self, published_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<f64> {
        let age = Self::age_hours(published_at, now);
        if age > self.cutoff_hours {
            return None;
        }
        Some(self.recency_weight(age)).filter(|w| *w > 0.0)
    }

    pub fn accumulate<'a, I>(&self, items: I, now: DateTime<Utc>) -> (DecayAccumulator, usize)
    where
        I: IntoIterator<Item = &'a ItemScore>,
    {
        let mut acc = DecayAccumulator::default();
        let mut stale = 0usize;
        for it in items {
            match self.weight_for(it.published_at, now) {
                Some(w) => acc.push(it.score, w),
                None => stale += 1,
            }
        }
        (acc, stale)
    }

    /// Aggregate score over all items. Contributions are summed in `item_id`
    /// order so the result is identical for any input permutation.
    pub fn aggregate(&self, items: &[ItemScore], now: DateTime<Utc>) -> TickerScore {
        let mut ordered: Vec<&ItemScore> = items.iter().collect();
        ordered.sort_by(|a, b| a.item_id.cmp(&b.item_id));

        let (acc, stale_count) = self.accumulate(ordered, now);
        TickerScore {
            aggregated_score: acc.mean(),
            item_count: acc.count,
            stale_count,
        }
    }
}
