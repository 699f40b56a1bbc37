//! # Justification Selector
//! Picks the evidence shown next to a suggestion.
//!
//! Ranking: |score| descending, newer `published_at` first on ties. The top K
//! are taken, except that when the evidence holds both signs and K >= 2 the
//! most extreme item of a missing sign replaces the lowest-ranked pick, so
//! dissenting evidence is never hidden.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::model::{ItemScore, Label, ScoredItem};
use crate::suggestion::{Suggestion, Thresholds};

/// One piece of evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JustificationEntry {
    pub item_id: String,
    #[serde(rename = "type")]
    pub kind: Label,
    pub headline: String,
    pub url: Option<String>,
    pub source: String,
    pub score: f64,
    pub published_at: DateTime<Utc>,
    /// Entry direction matches the suggestion direction (neutral supports Hold).
    pub supports: bool,
}

/// A scored item joined with its source metadata.
#[derive(Debug, Clone, Copy)]
pub struct Evidence<'a> {
    pub item: &'a ScoredItem,
    pub score: &'a ItemScore,
}

fn rank(a: &Evidence<'_>, b: &Evidence<'_>) -> Ordering {
    b.score
        .score
        .abs()
        .total_cmp(&a.score.score.abs())
        .then_with(|| b.item.published_at.cmp(&a.item.published_at))
        .then_with(|| a.item.item_id.cmp(&b.item.item_id))
}

pub fn select_justification(
    evidence: &[Evidence<'_>],
    suggestion: Suggestion,
    k: usize,
    thresholds: &Thresholds,
) -> Vec<JustificationEntry> {
    if k == 0 || evidence.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<Evidence<'_>> = evidence.to_vec();
    ranked.sort_by(rank);

    let take = k.min(ranked.len());
    let mut picked: Vec<usize> = (0..take).collect();

    let has_pos = ranked.iter().any(|e| e.score.score > 0.0);
    let has_neg = ranked.iter().any(|e| e.score.score < 0.0);
    if k >= 2 && has_pos && has_neg {
        for want_positive in [true, false] {
            let matches = |e: &Evidence<'_>| {
                if want_positive {
                    e.score.score > 0.0
                } else {
                    e.score.score < 0.0
                }
            };
            if picked.iter().any(|&i| matches(&ranked[i])) {
                continue;
            }
            let Some(missing) = ranked.iter().position(|e| matches(e)) else {
                continue;
            };
            // Every pick is of the other sign or zero; drop the weakest one.
            if let Some(last) = picked.last_mut() {
                *last = missing;
            }
            picked.sort_unstable();
        }
    }

    let direction = suggestion.direction();
    picked
        .into_iter()
        .map(|i| {
            let e = &ranked[i];
            let kind = thresholds.label_for(e.score.score);
            JustificationEntry {
                item_id: e.item.item_id.clone(),
                kind,
                headline: e.item.headline.clone(),
                url: e.item.url_or_id.clone(),
                source: e.item.source_name.clone(),
                score: e.score.score,
                published_at: e.item.published_at,
                supports: direction == Some(kind),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceType;
    use chrono::Duration;

    struct Fixture {
        items: Vec<ScoredItem>,
        scores: Vec<ItemScore>,
    }

    impl Fixture {
        fn new(rows: &[(&str, f64, i64)]) -> Self {
            let now = Utc::now();
            let mut items = Vec::new();
            let mut scores = Vec::new();
            for (id, score, age) in rows {
                let published_at = now - Duration::hours(*age);
                items.push(ScoredItem {
                    item_id: id.to_string(),
                    source_type: SourceType::News,
                    source_name: "Wire".into(),
                    url_or_id: Some(format!("https://news/{id}")),
                    headline: format!("headline {id}"),
                    body: None,
                    published_at,
                    fetched_at: published_at,
                });
                scores.push(ItemScore {
                    item_id: id.to_string(),
                    label: Label::Neutral,
                    score: *score,
                    chunk_count: 1,
                    failed_chunk_count: 0,
                    published_at,
                });
            }
            Self { items, scores }
        }

        fn evidence(&self) -> Vec<Evidence<'_>> {
            self.items
                .iter()
                .zip(self.scores.iter())
                .map(|(item, score)| Evidence { item, score })
                .collect()
        }
    }

    fn ids(v: &[JustificationEntry]) -> Vec<&str> {
        v.iter().map(|e| e.item_id.as_str()).collect()
    }

    #[test]
    fn ranks_by_magnitude() {
        let f = Fixture::new(&[("a", 0.2, 1), ("b", 0.9, 1), ("c", 0.5, 1)]);
        let out = select_justification(&f.evidence(), Suggestion::Buy, 2, &Thresholds::default());
        assert_eq!(ids(&out), vec!["b", "c"]);
        assert!(out.iter().all(|e| e.supports && e.kind == Label::Positive));
    }

    #[test]
    fn dissent_is_always_shown() {
        let f = Fixture::new(&[
            ("p1", 0.9, 1),
            ("p2", 0.8, 1),
            ("p3", 0.7, 1),
            ("n1", -0.3, 1),
            ("n2", -0.1, 1),
        ]);
        let out = select_justification(&f.evidence(), Suggestion::Buy, 3, &Thresholds::default());
        assert_eq!(ids(&out), vec!["p1", "p2", "n1"]);
        assert_eq!(out[2].kind, Label::Negative);
        assert!(!out[2].supports);
    }

    #[test]
    fn single_slot_skips_dissent_rule() {
        let f = Fixture::new(&[("p", 0.9, 1), ("n", -0.3, 1)]);
        let out = select_justification(&f.evidence(), Suggestion::Buy, 1, &Thresholds::default());
        assert_eq!(ids(&out), vec!["p"]);
    }

    #[test]
    fn ties_prefer_newer() {
        let f = Fixture::new(&[("old", 0.5, 10), ("new", -0.5, 1), ("mid", 0.5, 5)]);
        let out = select_justification(&f.evidence(), Suggestion::Hold, 2, &Thresholds::default());
        assert_eq!(ids(&out), vec!["new", "mid"]);
    }

    #[test]
    fn neutral_entries_support_hold() {
        let f = Fixture::new(&[("z", 0.05, 1)]);
        let out = select_justification(&f.evidence(), Suggestion::Hold, 5, &Thresholds::default());
        assert_eq!(out[0].kind, Label::Neutral);
        assert!(out[0].supports);
    }
}
