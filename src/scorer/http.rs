//! HTTP adapter for a FinBERT-style classification service.
//!
//! Request:  `POST {base}/predict {"texts": ["..."], "use_cache": true}`
//! Response: `{"predictions": [{"label": "positive", "confidence": 0.93}]}`

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Scorer;
use crate::error::ScoreUnavailable;
use crate::model::ChunkResult;

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    texts: [&'a str; 1],
    use_cache: bool,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    label: String,
    confidence: f64,
}

#[derive(Debug, Clone)]
pub struct HttpScorer {
    http: reqwest::Client,
    base_url: String,
}

impl HttpScorer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("ticker-sentiment-engine/0.1")
            .connect_timeout(timeout.min(Duration::from_secs(4)))
            .timeout(timeout)
            .build()
            .context("building classifier HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Scorer for HttpScorer {
    async fn score(&self, text: &str) -> Result<ChunkResult, ScoreUnavailable> {
        if text.trim().is_empty() {
            return Err(ScoreUnavailable::MalformedInput("empty text".into()));
        }

        let resp = self
            .http
            .post(format!("{}/predict", self.base_url))
            .json(&PredictRequest {
                texts: [text],
                use_cache: true,
            })
            .send()
            .await
            .map_err(map_transport)?;

        let status = resp.status();
        if status.is_client_error() {
            return Err(ScoreUnavailable::MalformedInput(format!(
                "classifier rejected input with status {status}"
            )));
        }
        if !status.is_success() {
            return Err(ScoreUnavailable::Model(format!(
                "classifier returned status {status}"
            )));
        }

        let body: PredictResponse = resp.json().await.map_err(map_transport)?;
        let first = body
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| ScoreUnavailable::Model("empty predictions".into()))?;
        ChunkResult::from_classifier(&first.label, first.confidence)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn map_transport(e: reqwest::Error) -> ScoreUnavailable {
    if e.is_timeout() {
        ScoreUnavailable::Timeout
    } else {
        ScoreUnavailable::Model(e.to_string())
    }
}
