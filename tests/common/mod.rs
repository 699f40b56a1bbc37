// tests/common/mod.rs
//
// Shared fixtures: deterministic scorer doubles and RawItem builders.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use ticker_sentiment_engine::{
    ChunkResult, EngineConfig, Label, RawItem, ScoreUnavailable, Scorer, SentimentEngine,
    SourceType,
};

/// Fixed clock so scenarios are reproducible.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
}

/// Parses the first `[<f64>]` tag in the text. Untagged text is malformed,
/// `[err]` is a model error, `[panic]` panics, `[slow]` sleeps for a minute.
#[derive(Default)]
pub struct TagScorer {
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<String>>,
}

impl TagScorer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Scorer for TagScorer {
    async fn score(&self, text: &str) -> Result<ChunkResult, ScoreUnavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(text.to_string());

        let start = text
            .find('[')
            .ok_or_else(|| ScoreUnavailable::MalformedInput("no tag".into()))?;
        let len = text[start..]
            .find(']')
            .ok_or_else(|| ScoreUnavailable::MalformedInput("unterminated tag".into()))?;
        let tag = &text[start + 1..start + len];
        match tag {
            "err" => Err(ScoreUnavailable::Model("boom".into())),
            "panic" => panic!("scorer blew up"),
            "slow" => {
                tokio::time::sleep(StdDuration::from_secs(60)).await;
                Ok(ChunkResult::new(Label::Neutral, 0.0))
            }
            v => {
                let score: f64 = v
                    .parse()
                    .map_err(|_| ScoreUnavailable::Model(format!("bad tag {v}")))?;
                let label = if score > 0.0 {
                    Label::Positive
                } else if score < 0.0 {
                    Label::Negative
                } else {
                    Label::Neutral
                };
                Ok(ChunkResult::new(label, score))
            }
        }
    }

    fn name(&self) -> &'static str {
        "tag"
    }
}

/// Tracks the peak number of concurrent calls.
#[derive(Default)]
pub struct GaugeScorer {
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

#[async_trait]
impl Scorer for GaugeScorer {
    async fn score(&self, _text: &str) -> Result<ChunkResult, ScoreUnavailable> {
        let cur = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(cur, Ordering::SeqCst);
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(ChunkResult::new(Label::Positive, 0.3))
    }

    fn name(&self) -> &'static str {
        "gauge"
    }
}

pub fn engine_with(cfg: EngineConfig, scorer: Arc<dyn Scorer>) -> SentimentEngine {
    SentimentEngine::new(cfg, scorer).expect("valid config")
}

pub fn tag_engine() -> (SentimentEngine, Arc<TagScorer>) {
    let scorer = TagScorer::new();
    (engine_with(EngineConfig::default(), scorer.clone()), scorer)
}

pub fn news(id: &str, headline: &str, age_hours: f64) -> RawItem {
    let published_at = now() - Duration::seconds((age_hours * 3600.0) as i64);
    RawItem {
        source_type: SourceType::News,
        source_name: "Wire".into(),
        url_or_id: Some(format!("https://news.example/{id}")),
        headline: headline.into(),
        body: None,
        published_at,
        fetched_at: now(),
    }
}

pub fn social(id: &str, text: &str, age_hours: f64) -> RawItem {
    RawItem {
        source_type: SourceType::Social,
        source_name: "reddit".into(),
        url_or_id: Some(format!("t3_{id}")),
        headline: String::new(),
        body: Some(text.into()),
        ..news(id, "", age_hours)
    }
}
