use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::poll_loop::{RefreshOutcome, refresh_and_publish};
use crate::region::BoundingBox;
use crate::snapshot::{MatchResult, PassStats};
use crate::web::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    /// `nocache=1` runs a pass synchronously before answering
    pub nocache: Option<String>,
}

impl RefreshParams {
    pub fn force_refresh(&self) -> bool {
        self.nocache.as_deref() == Some("1")
    }
}

#[derive(Debug, Serialize)]
pub struct FlaggedFlightsResponse<'a> {
    /// Epoch seconds of the last completed pass, 0 before the first one
    pub fetched_at: i64,
    pub count: usize,
    pub results: &'a [MatchResult],
    pub last_update: Option<DateTime<Utc>>,
    pub history_authenticated: bool,
    pub stats: PassStats,
}

#[derive(Debug, Serialize)]
pub struct CompactFlight<'a> {
    pub icao: &'a str,
    pub callsign: Option<&'a str>,
    pub lat: f64,
    pub lon: f64,
    pub altitude: i64,
    pub speed: i64,
    pub heading: i64,
    pub timestamp: f64,
    pub last_seen: DateTime<Utc>,
}

impl<'a> From<&'a MatchResult> for CompactFlight<'a> {
    fn from(result: &'a MatchResult) -> Self {
        Self {
            icao: &result.icao24,
            callsign: result.callsign.as_deref(),
            lat: result.lat,
            lon: result.lon,
            altitude: result.altitude,
            speed: result.speed,
            heading: result.heading,
            timestamp: result.timestamp,
            last_seen: result.last_seen,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl From<BoundingBox> for Bounds {
    fn from(bbox: BoundingBox) -> Self {
        Self {
            north: bbox.max_lat,
            south: bbox.min_lat,
            east: bbox.max_lon,
            west: bbox.min_lon,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompactFlightsResponse<'a> {
    pub flights: Vec<CompactFlight<'a>>,
    pub count: usize,
    pub last_update: Option<DateTime<Utc>>,
    pub bounds: Bounds,
}

/// Forced refresh: the pass runs inside this request, then the cache is read as usual.
/// Upstream trouble never turns into an error response; staleness shows in the timestamp.
async fn refresh_if_requested(state: &AppState, params: &RefreshParams) {
    if !params.force_refresh() {
        return;
    }

    info!("Force refresh requested");
    match refresh_and_publish(&state.pipeline, &state.cache).await {
        RefreshOutcome::Published(snapshot) => {
            info!("Forced refresh published {} flights", snapshot.results.len())
        }
        RefreshOutcome::RegionUnavailable => {
            warn!("Forced refresh could not reach the region source, serving cached snapshot")
        }
        RefreshOutcome::Failed(e) => {
            error!("Forced refresh failed, serving cached snapshot: {:#}", e)
        }
    }
}

/// Handler for GET /api/flagged-flights
pub async fn get_flagged_flights(
    State(state): State<AppState>,
    Query(params): Query<RefreshParams>,
) -> impl IntoResponse {
    refresh_if_requested(&state, &params).await;

    let snapshot = state.cache.read();
    Json(FlaggedFlightsResponse {
        fetched_at: snapshot.fetched_at_epoch(),
        count: snapshot.results.len(),
        results: &snapshot.results,
        last_update: snapshot.fetched_at,
        history_authenticated: snapshot.history_authenticated,
        stats: snapshot.stats,
    })
    .into_response()
}

/// Handler for GET /api/flights
///
/// Compact view of the same snapshot, plus the region bounds for map framing
pub async fn get_flights(
    State(state): State<AppState>,
    Query(params): Query<RefreshParams>,
) -> impl IntoResponse {
    refresh_if_requested(&state, &params).await;

    let snapshot = state.cache.read();
    let flights: Vec<CompactFlight<'_>> = snapshot.results.iter().map(CompactFlight::from).collect();

    Json(CompactFlightsResponse {
        count: flights.len(),
        flights,
        last_update: snapshot.fetched_at,
        bounds: state.pipeline.region().bounding_box().into(),
    })
    .into_response()
}
