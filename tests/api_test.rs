mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use common::{ScriptedHistory, StaticRegion, pipeline_with, position, segment};
use skyfence::poll_loop::refresh_and_publish;
use skyfence::refresh_pipeline::PipelineSettings;
use skyfence::snapshot_cache::SnapshotCache;
use skyfence::web::{AppState, build_router};

fn test_state(region: Arc<StaticRegion>) -> AppState {
    let history = Arc::new(
        ScriptedHistory::new()
            .with_segments("aaa001", vec![segment(Some("LLBG"), Some("LTFM"))])
            .anonymous(),
    );
    AppState {
        cache: SnapshotCache::new(),
        pipeline: Arc::new(pipeline_with(region, history, PipelineSettings::default())),
        stale_after: Duration::from_secs(300),
    }
}

async fn get_json(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let response = build_router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_cold_cache_serves_empty_result() {
    let region = Arc::new(StaticRegion::new(vec![position("aaa001", 32.0, 39.0)]));
    let state = test_state(region.clone());

    let (status, body) = get_json(&state, "/api/flagged-flights").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fetched_at"], 0);
    assert_eq!(body["count"], 0);
    assert_eq!(body["results"], serde_json::json!([]));
    assert!(body["last_update"].is_null());
    // Plain reads never reach upstream
    assert_eq!(region.calls(), 0);
}

#[tokio::test]
async fn test_nocache_runs_a_pass_before_answering() {
    let region = Arc::new(StaticRegion::new(vec![
        position("aaa001", 32.0, 39.0),
        position("bbb002", 2.35, 48.85),
    ]));
    let state = test_state(region.clone());

    let (status, body) = get_json(&state, "/api/flagged-flights?nocache=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(region.calls(), 1);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["icao24"], "aaa001");
    assert_eq!(
        body["results"][0]["matched_flights"][0]["estDepartureAirport"],
        "LLBG"
    );
    assert_eq!(body["history_authenticated"], false);
    assert!(body["fetched_at"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_nocache_during_outage_serves_previous_snapshot() {
    let region = Arc::new(StaticRegion::new(vec![position("aaa001", 32.0, 39.0)]));
    let state = test_state(region.clone());
    assert!(refresh_and_publish(&state.pipeline, &state.cache).await.is_published());
    let fetched_at = state.cache.read().fetched_at_epoch();

    region.set_failing(true);
    let (status, body) = get_json(&state, "/api/flagged-flights?nocache=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["fetched_at"], fetched_at);
}

#[tokio::test]
async fn test_compact_flights_view() {
    let region = Arc::new(StaticRegion::new(vec![position("aaa001", 32.0, 39.0)]));
    let state = test_state(region);
    refresh_and_publish(&state.pipeline, &state.cache).await;

    let (status, body) = get_json(&state, "/api/flights").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["flights"][0]["icao"], "aaa001");
    assert_eq!(body["flights"][0]["altitude"], 10_000);
    assert_eq!(body["bounds"]["north"], 42.5);
    assert_eq!(body["bounds"]["south"], 35.0);
    assert_eq!(body["bounds"]["east"], 45.5);
    assert_eq!(body["bounds"]["west"], 25.0);
}

#[tokio::test]
async fn test_health_reports_staleness() {
    let region = Arc::new(StaticRegion::new(Vec::new()));
    let state = test_state(region);

    let (status, cold) = get_json(&state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cold["status"], "stale");
    assert!(cold["cache_age_seconds"].is_null());
    assert_eq!(cold["auth_configured"], false);

    refresh_and_publish(&state.pipeline, &state.cache).await;
    let (_, warm) = get_json(&state, "/health").await;
    assert_eq!(warm["status"], "healthy");
    assert_eq!(warm["cached_flights"], 0);
    assert!(warm["cache_age_seconds"].as_f64().unwrap() < 300.0);
}

#[tokio::test]
async fn test_status_describes_watch() {
    let state = test_state(Arc::new(StaticRegion::new(Vec::new())));

    let (status, body) = get_json(&state, "/data/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["region"], "Turkey");
    assert_eq!(body["data"]["flaggedPrefixes"], serde_json::json!(["LL"]));
    assert_eq!(body["data"]["candidateCap"], 120);
    assert_eq!(body["data"]["lookbackHours"], 6);
}
