//! # Suggestion Mapper
//! Pure mapping `(aggregated_score, previous state) -> Suggestion`.
//! No I/O and no hidden state; the previous suggestion is an explicit input.
//!
//! Base levels come from four monotonic thresholds. On top of that a
//! hysteresis margin keeps a single-step move from flipping the suggestion
//! while the score sits just past the boundary it crossed. Moves of two or
//! more levels always take effect.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::engine::config_err;
use crate::error::EngineResult;
use crate::model::{Label, SuggestionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Suggestion {
    StrongSell,
    Sell,
    Hold,
    Buy,
    StrongBuy,
    /// No item could be scored. Distinct from `Hold`, which means neutral evidence.
    NoData,
}

impl Suggestion {
    /// Ordinal level in -2..=2; `None` for `NoData`.
    pub fn level(self) -> Option<i8> {
        match self {
            Suggestion::StrongSell => Some(-2),
            Suggestion::Sell => Some(-1),
            Suggestion::Hold => Some(0),
            Suggestion::Buy => Some(1),
            Suggestion::StrongBuy => Some(2),
            Suggestion::NoData => None,
        }
    }

    pub fn from_level(level: i8) -> Option<Self> {
        match level {
            -2 => Some(Suggestion::StrongSell),
            -1 => Some(Suggestion::Sell),
            0 => Some(Suggestion::Hold),
            1 => Some(Suggestion::Buy),
            2 => Some(Suggestion::StrongBuy),
            _ => None,
        }
    }

    pub fn is_level(self) -> bool {
        self.level().is_some()
    }

    /// Direction of the suggestion expressed as an evidence label.
    pub fn direction(self) -> Option<Label> {
        match self.level()? {
            l if l > 0 => Some(Label::Positive),
            l if l < 0 => Some(Label::Negative),
            _ => Some(Label::Neutral),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Suggestion::StrongSell => "Strong Sell",
            Suggestion::Sell => "Sell",
            Suggestion::Hold => "Hold",
            Suggestion::Buy => "Buy",
            Suggestion::StrongBuy => "Strong Buy",
            Suggestion::NoData => "No Data",
        }
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Score thresholds. Also define the neutral band used for item labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// score <= strong_sell -> StrongSell
    pub strong_sell: f64,
    /// strong_sell < score <= sell -> Sell
    pub sell: f64,
    /// sell < score < buy -> Hold; buy <= score < strong_buy -> Buy
    pub buy: f64,
    /// score >= strong_buy -> StrongBuy
    pub strong_buy: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            strong_sell: -0.6,
            sell: -0.15,
            buy: 0.15,
            strong_buy: 0.6,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> EngineResult<()> {
        let all = [self.strong_sell, self.sell, self.buy, self.strong_buy];
        if all.iter().any(|t| !t.is_finite() || !(-1.0..=1.0).contains(t)) {
            return Err(config_err(format!(
                "thresholds must be finite and within [-1, 1], got {all:?}"
            )));
        }
        let monotonic = self.strong_sell < self.sell
            && self.sell < 0.0
            && 0.0 < self.buy
            && self.buy < self.strong_buy;
        if !monotonic {
            return Err(config_err(format!(
                "thresholds must satisfy strong_sell < sell < 0 < buy < strong_buy, got {all:?}"
            )));
        }
        Ok(())
    }

    /// Width of the narrowest finite band between adjacent thresholds.
    pub fn narrowest_band(&self) -> f64 {
        [
            self.sell - self.strong_sell,
            self.buy - self.sell,
            self.strong_buy - self.buy,
        ]
        .into_iter()
        .fold(f64::INFINITY, f64::min)
    }

    /// Base level without hysteresis.
    pub fn level_for(&self, score: f64) -> Suggestion {
        if score <= self.strong_sell {
            Suggestion::StrongSell
        } else if score <= self.sell {
            Suggestion::Sell
        } else if score < self.buy {
            Suggestion::Hold
        } else if score < self.strong_buy {
            Suggestion::Buy
        } else {
            Suggestion::StrongBuy
        }
    }

    /// Three-way label using the neutral band `(sell, buy)`.
    pub fn label_for(&self, score: f64) -> Label {
        if score <= self.sell {
            Label::Negative
        } else if score >= self.buy {
            Label::Positive
        } else {
            Label::Neutral
        }
    }

    /// Threshold separating two adjacent levels.
    pub fn boundary_between(&self, a: Suggestion, b: Suggestion) -> Option<f64> {
        let (la, lb) = (a.level()?, b.level()?);
        if (la - lb).abs() != 1 {
            return None;
        }
        match la.min(lb) {
            -2 => Some(self.strong_sell),
            -1 => Some(self.sell),
            0 => Some(self.buy),
            1 => Some(self.strong_buy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestionMapper {
    thresholds: Thresholds,
    hysteresis_margin: f64,
}

impl SuggestionMapper {
    pub fn new(thresholds: Thresholds, hysteresis_margin: f64) -> Self {
        Self {
            thresholds,
            hysteresis_margin,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Map an aggregate score to a suggestion given the previous persisted state.
    pub fn map(&self, score: Option<f64>, previous: Option<&SuggestionState>) -> Suggestion {
        let Some(score) = score.filter(|s| s.is_finite()) else {
            return Suggestion::NoData;
        };
        let raw = self.thresholds.level_for(score);

        let Some(prev) = previous.filter(|p| p.suggestion.is_level()) else {
            return raw;
        };
        let Some(boundary) = self.thresholds.boundary_between(prev.suggestion, raw) else {
            return raw;
        };

        if (score - boundary).abs() <= self.hysteresis_margin {
            tracing::debug!(
                ticker = %prev.ticker,
                previous = %prev.suggestion,
                previous_score = prev.aggregated_score,
                raw = %raw,
                score,
                boundary,
                "hysteresis kept previous suggestion"
            );
            prev.suggestion
        } else {
            raw
        }
    }
}
