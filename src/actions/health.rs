use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::snapshot::Snapshot;
use crate::web::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" while the snapshot is younger than the staleness threshold, else "stale"
    pub status: &'static str,
    /// `null` until the first pass completes
    pub cache_age_seconds: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub cached_flights: usize,
    pub auth_configured: bool,
}

impl HealthResponse {
    pub fn from_snapshot(
        snapshot: &Snapshot,
        now: DateTime<Utc>,
        stale_after_secs: f64,
        auth_configured: bool,
    ) -> Self {
        let cache_age_seconds = snapshot.age_seconds(now);
        let healthy = cache_age_seconds.is_some_and(|age| age < stale_after_secs);

        Self {
            status: if healthy { "healthy" } else { "stale" },
            cache_age_seconds,
            timestamp: now,
            cached_flights: snapshot.results.len(),
            auth_configured,
        }
    }
}

/// Handler for GET /health
///
/// Always 200; staleness is reported in the body.
pub async fn get_health(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.cache.read();
    Json(HealthResponse::from_snapshot(
        &snapshot,
        Utc::now(),
        state.stale_after.as_secs_f64(),
        state.pipeline.history_authenticated(),
    ))
}
