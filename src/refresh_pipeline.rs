//! One refresh pass: region fetch, geofence, history lookups, match selection
//!
//! A pass never fails because an upstream call failed. A region failure produces
//! an empty pass flagged `region_available = false`; a history failure for one
//! aircraft counts as "no segments" for that aircraft only. The only `Err` a pass
//! returns is an internal one (e.g. an unrepresentable time window).

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::airports::FlaggedAirports;
use crate::flights::{FlightSegment, select_matches};
use crate::position::Position;
use crate::region::Region;
use crate::snapshot::{MatchResult, PassStats, Snapshot};
use crate::upstream::{HistoryQuery, RegionQuery};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Maximum aircraft whose history is queried per pass
    pub candidate_cap: usize,
    /// How far back flight history is searched
    pub lookback: Duration,
    /// History queries in flight at once
    pub history_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            candidate_cap: 120,
            lookback: Duration::hours(6),
            history_concurrency: 4,
        }
    }
}

/// Output of a single pass
#[derive(Debug, Clone)]
pub struct Pass {
    pub completed_at: DateTime<Utc>,
    pub results: Vec<MatchResult>,
    pub stats: PassStats,
    /// False when the region source failed outright; such a pass must not be published
    pub region_available: bool,
    pub history_authenticated: bool,
}

impl Pass {
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            fetched_at: Some(self.completed_at),
            results: self.results,
            stats: self.stats,
            history_authenticated: self.history_authenticated,
        }
    }
}

pub struct RefreshPipeline {
    region_query: Arc<dyn RegionQuery>,
    history_query: Arc<dyn HistoryQuery>,
    region: Region,
    flagged: FlaggedAirports,
    settings: PipelineSettings,
}

impl RefreshPipeline {
    pub fn new(
        region_query: Arc<dyn RegionQuery>,
        history_query: Arc<dyn HistoryQuery>,
        region: Region,
        flagged: FlaggedAirports,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            region_query,
            history_query,
            region,
            flagged,
            settings,
        }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn flagged(&self) -> &FlaggedAirports {
        &self.flagged
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn history_authenticated(&self) -> bool {
        self.history_query.is_authenticated()
    }

    pub async fn run_pass(&self) -> Result<Pass> {
        self.run_pass_at(Utc::now()).await
    }

    /// Run a pass with the history window ending at `now`
    #[tracing::instrument(name = "refresh_pass", skip_all, fields(region = %self.region.name()))]
    pub async fn run_pass_at(&self, now: DateTime<Utc>) -> Result<Pass> {
        let start = Instant::now();
        let window_start = now
            .checked_sub_signed(self.settings.lookback)
            .with_context(|| {
                format!(
                    "Lookback of {}s before {} is out of range",
                    self.settings.lookback.num_seconds(),
                    now
                )
            })?;
        let history_authenticated = self.history_query.is_authenticated();
        let mut stats = PassStats::default();

        let positions = match self
            .region_query
            .fetch_positions(&self.region.bounding_box())
            .await
        {
            Ok(positions) => positions,
            Err(e) => {
                warn!("Region fetch failed, pass is empty: {:#}", e);
                metrics::counter!("refresh.region_failures_total").increment(1);
                return Ok(Pass {
                    completed_at: Utc::now(),
                    results: Vec::new(),
                    stats,
                    region_available: false,
                    history_authenticated,
                });
            }
        };
        stats.positions_fetched = positions.len();

        // Upstream order decides who makes the cap, not relevance
        let mut candidates = self.geofence(positions);
        stats.in_region = candidates.len();
        candidates.truncate(self.settings.candidate_cap);
        stats.candidates = candidates.len();

        info!(
            positions = stats.positions_fetched,
            in_region = stats.in_region,
            candidates = stats.candidates,
            "Fetched positions for region"
        );

        let looked_up = self.lookup_histories(candidates, window_start, now).await;

        let mut results = Vec::new();
        for (position, segments) in looked_up {
            let segments = match segments {
                Ok(segments) => segments,
                Err(e) => {
                    debug!(icao24 = %position.icao24, "History lookup failed: {:#}", e);
                    stats.history_failures += 1;
                    Vec::new()
                }
            };

            let matched = select_matches(&segments, &self.flagged);
            if matched.is_empty() {
                continue;
            }
            results.push(MatchResult::new(&position, matched, Utc::now()));
        }
        stats.matches = results.len();

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::counter!("refresh.passes_total").increment(1);
        metrics::counter!("refresh.history_failures_total")
            .increment(stats.history_failures as u64);
        metrics::counter!("refresh.matches_total").increment(stats.matches as u64);
        metrics::gauge!("refresh.candidates").set(stats.candidates as f64);
        metrics::gauge!("refresh.matches").set(stats.matches as f64);
        metrics::histogram!("refresh.pass_duration_ms").record(duration_ms);

        if stats.history_failures > 0 && !history_authenticated {
            warn!(
                "{} of {} history lookups failed without credentials, matches may be undercounted",
                stats.history_failures, stats.candidates
            );
        }
        info!(
            matches = stats.matches,
            history_failures = stats.history_failures,
            "Pass completed in {:.1}ms",
            duration_ms
        );

        Ok(Pass {
            completed_at: Utc::now(),
            results,
            stats,
            region_available: true,
            history_authenticated,
        })
    }

    fn geofence(&self, positions: Vec<Position>) -> Vec<Position> {
        positions
            .into_iter()
            .filter(|p| self.region.contains(p.longitude, p.latitude))
            .collect()
    }

    /// Query history for every candidate; output order matches input order
    async fn lookup_histories(
        &self,
        candidates: Vec<Position>,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<(Position, Result<Vec<FlightSegment>>)> {
        let history = &self.history_query;
        stream::iter(candidates)
            .map(|position| async move {
                let segments = history.fetch_segments(&position.icao24, begin, end).await;
                (position, segments)
            })
            .buffered(self.settings.history_concurrency.max(1))
            .collect()
            .await
    }
}
