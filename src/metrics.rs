//! Prometheus exposition plus the engine's metric names.
//!
//! Recording goes through the `metrics` facade; with no recorder installed
//! (library use, tests) every call is a no-op.

use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const ITEMS_TOTAL: &str = "engine_items_total";
pub const ITEMS_EMPTY_TOTAL: &str = "engine_items_empty_total";
pub const ITEMS_DUPLICATE_TOTAL: &str = "engine_items_duplicate_total";
pub const ITEMS_IRRELEVANT_TOTAL: &str = "engine_items_irrelevant_total";
pub const ITEMS_STALE_TOTAL: &str = "engine_items_stale_total";
pub const ITEMS_FAILED_TOTAL: &str = "engine_items_failed_total";
pub const CHUNKS_SCORED_TOTAL: &str = "engine_chunks_scored_total";
pub const CHUNKS_FAILED_TOTAL: &str = "engine_chunks_failed_total";
pub const ALERTS_TOTAL: &str = "engine_alerts_total";
pub const RUN_MS: &str = "engine_run_ms";
pub const LAST_SCORE: &str = "engine_last_aggregated_score";

/// One-time registration against whatever recorder is current. `Metrics::init`
/// re-describes after installing, so an engine built first loses nothing.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_metrics);
}

/// Registers help text for every engine series on the current recorder.
pub fn describe_metrics() {
    describe_counter!(ITEMS_TOTAL, "Raw items received by analyze runs.");
    describe_counter!(ITEMS_EMPTY_TOTAL, "Items dropped for having no text.");
    describe_counter!(ITEMS_DUPLICATE_TOTAL, "Items removed by deduplication.");
    describe_counter!(
        ITEMS_IRRELEVANT_TOTAL,
        "Items dropped for not mentioning the ticker."
    );
    describe_counter!(
        ITEMS_STALE_TOTAL,
        "Items older than the decay cutoff, skipped before scoring."
    );
    describe_counter!(ITEMS_FAILED_TOTAL, "Items whose chunks all failed to score.");
    describe_counter!(CHUNKS_SCORED_TOTAL, "Chunks scored successfully.");
    describe_counter!(CHUNKS_FAILED_TOTAL, "Chunks the scorer could not score.");
    describe_counter!(ALERTS_TOTAL, "Suggestion changes that raised an alert.");
    describe_histogram!(RUN_MS, "Wall time of one analyze run in milliseconds.");
    describe_gauge!(LAST_SCORE, "Most recent aggregated score per ticker.");
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_metrics();
        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus text format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
