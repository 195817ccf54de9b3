//! Status endpoint: build information, uptime, and what the poller is watching

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Instant;

use super::DataResponse;
use crate::web::AppState;

static SERVER_START_TIME: OnceLock<Instant> = OnceLock::new();

/// Record the server start time; call once when the server starts
pub fn init_server_start_time() {
    SERVER_START_TIME.get_or_init(Instant::now);
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    /// `git describe --tags --always --dirty`
    pub version: &'static str,
    pub git_commit: &'static str,
    pub build_timestamp: &'static str,
    pub target: &'static str,
    pub uptime_seconds: u64,
    pub uptime_human: String,
    pub region: String,
    pub flagged_prefixes: Vec<String>,
    pub candidate_cap: usize,
    pub lookback_hours: i64,
}

fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, secs)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Handler for GET /data/status
#[tracing::instrument(skip(state))]
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let uptime_seconds = SERVER_START_TIME
        .get_or_init(Instant::now)
        .elapsed()
        .as_secs();
    let settings = state.pipeline.settings();

    let status = StatusInfo {
        version: env!("VERGEN_GIT_DESCRIBE"),
        git_commit: env!("VERGEN_GIT_SHA"),
        build_timestamp: env!("VERGEN_BUILD_TIMESTAMP"),
        target: env!("VERGEN_CARGO_TARGET_TRIPLE"),
        uptime_seconds,
        uptime_human: format_duration(uptime_seconds),
        region: state.pipeline.region().name().to_string(),
        flagged_prefixes: state.pipeline.flagged().prefixes().to_vec(),
        candidate_cap: settings.candidate_cap,
        lookback_hours: settings.lookback.num_hours(),
    };

    (StatusCode::OK, Json(DataResponse { data: status }))
}
