use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::Scorer;
use crate::error::ScoreUnavailable;
use crate::model::{ChunkResult, Label};

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).unwrap_or_else(|e| {
        tracing::error!(error = %e, "sentiment lexicon failed to parse; scoring everything neutral");
        HashMap::new()
    })
});

/// Squashing constant for `raw / sqrt(raw^2 + ALPHA)`.
const ALPHA: f64 = 15.0;
/// |score| below this is labelled neutral.
const NEUTRAL_EPS: f64 = 0.05;

/// Offline lexicon scorer with a short negation window.
#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Returns (raw score, token count).
    /// A negator within the previous 1..=3 tokens flips the word's sign.
    pub fn score_text(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;

        for i in 0..tokens.len() {
            let base = self.word_score(tokens[i].as_str());
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }

        (score, tokens.len())
    }

    /// Raw lexicon sum squashed into [-1, 1].
    pub fn normalized(raw: i32) -> f64 {
        let r = raw as f64;
        r / (r * r + ALPHA).sqrt()
    }
}

#[async_trait]
impl Scorer for LexiconScorer {
    async fn score(&self, text: &str) -> Result<ChunkResult, ScoreUnavailable> {
        let (raw, tokens) = self.score_text(text);
        if tokens == 0 {
            return Err(ScoreUnavailable::MalformedInput(
                "text has no word tokens".into(),
            ));
        }
        let score = Self::normalized(raw);
        let label = if score >= NEUTRAL_EPS {
            Label::Positive
        } else if score <= -NEUTRAL_EPS {
            Label::Negative
        } else {
            Label::Neutral
        };
        Ok(ChunkResult::new(label, score))
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Alphanumeric tokens (apostrophes kept for contractions), lower-case.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "didn't"
            | "doesn't"
            | "without"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_and_negative_words_count() {
        let s = LexiconScorer::new();
        let (raw, n) = s.score_text("ACME shares surge after strong quarter");
        assert_eq!(raw, 5);
        assert_eq!(n, 6);
        let (raw, _) = s.score_text("Guidance cut; shares plunge");
        assert_eq!(raw, -4);
    }

    #[test]
    fn negation_flips_sign() {
        let s = LexiconScorer::new();
        let (raw, _) = s.score_text("results did not disappoint");
        assert_eq!(raw, 2);
        let (raw, _) = s.score_text("the rally isn't strong");
        // "rally" precedes the negator, "strong" is negated
        assert_eq!(raw, 0);
    }

    #[test]
    fn normalized_is_bounded_and_odd() {
        for raw in [-50, -3, 0, 3, 50] {
            let v = LexiconScorer::normalized(raw);
            assert!((-1.0..=1.0).contains(&v));
            assert!((v + LexiconScorer::normalized(-raw)).abs() < 1e-12);
        }
    }

    #[tokio::test]
    async fn empty_text_is_unavailable() {
        let s = LexiconScorer::new();
        assert!(matches!(
            s.score("  ...  ").await,
            Err(ScoreUnavailable::MalformedInput(_))
        ));
        let r = s.score("Quarterly report published").await.unwrap();
        assert_eq!(r.label, Label::Neutral);
    }
}
