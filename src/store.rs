//! Persistence seam for the last emitted suggestion per ticker.
//!
//! The engine reads once and writes once per run through `StateStore`.
//! Keys are canonical tickers (trimmed, upper-case).

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

use crate::model::{canonical_ticker, SuggestionState};

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_previous_suggestion(&self, ticker: &str) -> Result<Option<SuggestionState>>;
    async fn put_suggestion(&self, ticker: &str, state: SuggestionState) -> Result<()>;
}

/// In-process store. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    inner: RwLock<HashMap<String, SuggestionState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_previous_suggestion(&self, ticker: &str) -> Result<Option<SuggestionState>> {
        Ok(self.inner.read().await.get(&canonical_ticker(ticker)).cloned())
    }

    async fn put_suggestion(&self, ticker: &str, state: SuggestionState) -> Result<()> {
        self.inner
            .write()
            .await
            .insert(canonical_ticker(ticker), state);
        Ok(())
    }
}

/// One pretty-printed JSON file per ticker under `dir`
/// (`state/ACME.json`). Writes go to a temp file first, then rename.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    dir: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, ticker: &str) -> Result<PathBuf> {
        let key = canonical_ticker(ticker);
        let safe = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '^' | '='))
            && !key.starts_with('.');
        if !safe {
            anyhow::bail!("ticker {ticker:?} is not usable as a state key");
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn get_previous_suggestion(&self, ticker: &str) -> Result<Option<SuggestionState>> {
        let path = self.path_for(ticker)?;
        let raw = match fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading state file {}", path.display()))
            }
        };
        let state = serde_json::from_str(&raw)
            .with_context(|| format!("parsing state file {}", path.display()))?;
        Ok(Some(state))
    }

    async fn put_suggestion(&self, ticker: &str, state: SuggestionState) -> Result<()> {
        let path = self.path_for(ticker)?;
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating state dir {}", self.dir.display()))?;

        let body = serde_json::to_vec_pretty(&state).context("serializing suggestion state")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("replacing {}", path.display()))?;
        tracing::debug!(path = %path.display(), suggestion = %state.suggestion, "state written");
        Ok(())
    }
}
