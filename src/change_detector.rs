//! # Change Detector
//! Compares the new suggestion against the persisted one and decides whether
//! an alert fires. Pure; persistence is handled by the caller.

use serde::{Deserialize, Serialize};

use crate::model::SuggestionState;
use crate::suggestion::Suggestion;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSignal {
    pub alert: bool,
    pub from: Option<Suggestion>,
    pub to: Suggestion,
    /// e.g. "Sell → Hold"; `None` when no alert fires.
    pub description: Option<String>,
}

impl ChangeSignal {
    fn quiet(from: Option<Suggestion>, to: Suggestion) -> Self {
        Self {
            alert: false,
            from,
            to,
            description: None,
        }
    }
}

pub fn describe_transition(from: Suggestion, to: Suggestion) -> String {
    format!("{} → {}", from.display_name(), to.display_name())
}

/// First observation and NoData on either side never alert.
pub fn detect(previous: Option<&SuggestionState>, new: Suggestion) -> ChangeSignal {
    let Some(prev) = previous else {
        tracing::trace!(to = %new, "no prior suggestion, nothing to compare");
        return ChangeSignal::quiet(None, new);
    };
    let from = prev.suggestion;

    if from == Suggestion::NoData || new == Suggestion::NoData || from == new {
        tracing::trace!(%from, to = %new, "no change");
        return ChangeSignal::quiet(Some(from), new);
    }

    let description = describe_transition(from, new);
    tracing::info!(ticker = %prev.ticker, %description, "suggestion changed");
    ChangeSignal {
        alert: true,
        from: Some(from),
        to: new,
        description: Some(description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn prev(s: Suggestion) -> SuggestionState {
        SuggestionState {
            ticker: "ACME".into(),
            suggestion: s,
            aggregated_score: 0.0,
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn first_run_is_silent() {
        let sig = detect(None, Suggestion::Buy);
        assert!(!sig.alert);
        assert_eq!(sig.from, None);
        assert_eq!(sig.to, Suggestion::Buy);
    }

    #[test]
    fn level_change_alerts() {
        let p = prev(Suggestion::Sell);
        let sig = detect(Some(&p), Suggestion::Hold);
        assert!(sig.alert);
        assert_eq!(sig.description.as_deref(), Some("Sell → Hold"));
    }

    #[test]
    fn same_level_is_silent() {
        let p = prev(Suggestion::Buy);
        assert!(!detect(Some(&p), Suggestion::Buy).alert);
    }

    #[test]
    fn no_data_never_alerts() {
        let p = prev(Suggestion::Buy);
        assert!(!detect(Some(&p), Suggestion::NoData).alert);
        let p = prev(Suggestion::NoData);
        assert!(!detect(Some(&p), Suggestion::StrongSell).alert);
    }
}
