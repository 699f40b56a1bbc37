// tests/metrics.rs
//
// Installs the Prometheus recorder once for this test binary, runs an
// analysis and checks the exposition on /metrics.

mod common;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use ticker_sentiment_engine::metrics::Metrics;

#[tokio::test]
async fn metrics_endpoint_contains_engine_series() {
    // Engine first: its one-time describe lands on the no-op recorder.
    let (engine, _) = common::tag_engine();
    let metrics = Metrics::init().expect("first recorder install succeeds");

    let items = vec![
        common::news("a", "ACME up [0.4]", 1.0),
        common::news("a", "ACME up [0.4]", 1.0),
        common::news("b", "ACME [err]", 1.0),
    ];
    let agg = engine.analyze("ACME", items, None, common::now()).await;
    assert_eq!(agg.item_count, 1);

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for series in [
        "engine_items_total 3",
        "engine_items_duplicate_total 1",
        "engine_items_failed_total 1",
        "engine_chunks_failed_total 1",
        "engine_chunks_scored_total 1",
        "engine_last_aggregated_score{ticker=\"ACME\"}",
        "engine_run_ms",
    ] {
        assert!(text.contains(series), "missing `{series}` in:\n{text}");
    }
    assert!(
        text.contains("# HELP engine_items_total Raw items received by analyze runs."),
        "help text missing:\n{text}"
    );

    assert!(Metrics::init().is_err(), "second install must fail, not panic");
}
