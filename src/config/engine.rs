// src/config/engine.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::suggestion::Thresholds;

pub const ENV_CONFIG_PATH: &str = "ENGINE_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Same-headline items from the same source within this window are duplicates.
    pub dedup_tolerance_hours: f64,
    /// Minimum ticker/company mentions for an item to count as relevant. 0 disables the filter.
    pub min_ticker_mentions: usize,
    pub company_name: Option<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            dedup_tolerance_hours: 6.0,
            min_ticker_mentions: 0,
            company_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// ~450 tokens at roughly 4 chars per token.
    pub max_chunk_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 1800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub half_life_hours: f64,
    /// Items older than `cutoff_half_lives * half_life_hours` leave the window.
    pub cutoff_half_lives: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            half_life_hours: 24.0,
            cutoff_half_lives: 3.0,
        }
    }
}

impl DecayConfig {
    pub fn cutoff_hours(&self) -> f64 {
        self.half_life_hours * self.cutoff_half_lives
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerKind {
    Lexicon,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub kind: ScorerKind,
    /// Base URL of the classifier service (`kind = "http"` only).
    pub url: Option<String>,
    /// Max simultaneous scorer calls.
    pub concurrency: usize,
    pub timeout_ms: u64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            kind: ScorerKind::Lexicon,
            url: None,
            concurrency: 4,
            timeout_ms: 10_000,
        }
    }
}

impl ScorerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Full engine configuration. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub normalizer: NormalizerConfig,
    pub chunker: ChunkerConfig,
    pub decay: DecayConfig,
    pub thresholds: Thresholds,
    pub hysteresis_margin: f64,
    pub justification_count: usize,
    pub scorer: ScorerConfig,
    pub state_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerConfig::default(),
            chunker: ChunkerConfig::default(),
            decay: DecayConfig::default(),
            thresholds: Thresholds::default(),
            hysteresis_margin: 0.03,
            justification_count: 5,
            scorer: ScorerConfig::default(),
            state_dir: PathBuf::from("state"),
        }
    }
}

impl EngineConfig {
    /// Load from an explicit path. Supports TOML or JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_config(&content, ext.as_str())
    }

    /// Load using env var + fallbacks:
    /// 1) $ENGINE_CONFIG_PATH
    /// 2) config/engine.toml
    /// 3) config/engine.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let toml_p = PathBuf::from("config/engine.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/engine.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    /// Reject configurations that would make the mapper or the decay ill-defined.
    pub fn validate(&self) -> EngineResult<()> {
        self.thresholds.validate()?;

        let m = self.hysteresis_margin;
        if !m.is_finite() || m < 0.0 {
            return Err(config_err(format!(
                "hysteresis_margin must be a finite value >= 0, got {m}"
            )));
        }
        let narrowest = self.thresholds.narrowest_band();
        if m * 2.0 >= narrowest {
            return Err(config_err(format!(
                "hysteresis_margin {m} must be below half of the narrowest band ({narrowest})"
            )));
        }

        let d = &self.decay;
        if !(d.half_life_hours.is_finite() && d.half_life_hours > 0.0) {
            return Err(config_err(format!(
                "decay.half_life_hours must be > 0, got {}",
                d.half_life_hours
            )));
        }
        if !(d.cutoff_half_lives.is_finite() && d.cutoff_half_lives > 0.0) {
            return Err(config_err(format!(
                "decay.cutoff_half_lives must be > 0, got {}",
                d.cutoff_half_lives
            )));
        }

        let tol = self.normalizer.dedup_tolerance_hours;
        if !tol.is_finite() || !(0.0..=MAX_DEDUP_TOLERANCE_HOURS).contains(&tol) {
            return Err(config_err(format!(
                "normalizer.dedup_tolerance_hours must be within 0..={MAX_DEDUP_TOLERANCE_HOURS}, got {tol}"
            )));
        }
        if self.chunker.max_chunk_chars == 0 {
            return Err(config_err("chunker.max_chunk_chars must be > 0"));
        }
        if self.justification_count == 0 {
            return Err(config_err("justification_count must be > 0"));
        }
        if self.scorer.concurrency == 0 {
            return Err(config_err("scorer.concurrency must be > 0"));
        }
        if self.scorer.timeout_ms == 0 {
            return Err(config_err("scorer.timeout_ms must be > 0"));
        }
        if self.scorer.kind == ScorerKind::Http
            && self.scorer.url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(config_err("scorer.url is required when scorer.kind = \"http\""));
        }
        Ok(())
    }
}

/// Upper bound for the dedup window: one year.
pub const MAX_DEDUP_TOLERANCE_HOURS: f64 = 24.0 * 365.0;

pub(crate) fn config_err(msg: impl Into<String>) -> EngineError {
    EngineError::Configuration(msg.into())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<EngineConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing engine config as JSON");
    }
    match toml::from_str::<EngineConfig>(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|_| anyhow!("unsupported engine config format: {toml_err}")),
    }
}
