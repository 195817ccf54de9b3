//! Scripted upstream sources for pipeline, poller, and API tests
//!
//! ```no_run
//! let region = Arc::new(StaticRegion::new(vec![position("abc123", 32.0, 39.0)]));
//! let history = Arc::new(
//!     ScriptedHistory::new().with_segments("abc123", vec![segment(Some("LLBG"), Some("LTFM"))]),
//! );
//! let pipeline = pipeline_with(region, history, PipelineSettings::default());
//! ```

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use skyfence::airports::FlaggedAirports;
use skyfence::flights::FlightSegment;
use skyfence::position::Position;
use skyfence::refresh_pipeline::{PipelineSettings, RefreshPipeline};
use skyfence::region::{BoundingBox, Region};
use skyfence::upstream::{HistoryQuery, RegionQuery};

pub fn position(icao24: &str, longitude: f64, latitude: f64) -> Position {
    Position::new(icao24, Some("TEST1"), "Turkey", longitude, latitude)
        .with_altitude(Some(10_000.0))
        .with_velocity(Some(230.0))
        .with_heading(Some(90.0))
}

pub fn segment(departure: Option<&str>, arrival: Option<&str>) -> FlightSegment {
    FlightSegment {
        departure_airport: departure.map(str::to_string),
        arrival_airport: arrival.map(str::to_string),
        first_seen: Some(1_700_000_000),
        last_seen: Some(1_700_003_600),
    }
}

/// Region source returning a fixed list of positions, or failing on demand
pub struct StaticRegion {
    positions: Mutex<Vec<Position>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl StaticRegion {
    pub fn new(positions: Vec<Position>) -> Self {
        Self {
            positions: Mutex::new(positions),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        let region = Self::new(Vec::new());
        region.set_failing(true);
        region
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_positions(&self, positions: Vec<Position>) {
        *self.positions.lock().unwrap() = positions;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegionQuery for StaticRegion {
    async fn fetch_positions(&self, _bbox: &BoundingBox) -> Result<Vec<Position>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("region source unreachable");
        }
        Ok(self.positions.lock().unwrap().clone())
    }
}

/// History source answering from a map; unknown aircraft have no flights
#[derive(Default)]
pub struct ScriptedHistory {
    segments: HashMap<String, Vec<FlightSegment>>,
    failing: HashSet<String>,
    anonymous: bool,
    queried: Mutex<Vec<String>>,
}

impl ScriptedHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segments(mut self, icao24: &str, segments: Vec<FlightSegment>) -> Self {
        self.segments.insert(icao24.to_string(), segments);
        self
    }

    pub fn failing_for(mut self, icao24: &str) -> Self {
        self.failing.insert(icao24.to_string());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Aircraft queried so far, in call order
    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryQuery for ScriptedHistory {
    async fn fetch_segments(
        &self,
        icao24: &str,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FlightSegment>> {
        assert!(begin < end, "history window must be non-empty");
        self.queried.lock().unwrap().push(icao24.to_string());
        if self.failing.contains(icao24) {
            bail!("history lookup for {} timed out", icao24);
        }
        Ok(self.segments.get(icao24).cloned().unwrap_or_default())
    }

    fn is_authenticated(&self) -> bool {
        !self.anonymous
    }
}

/// History source that answers every aircraft with one LLBG departure, or panics when told to
#[derive(Default)]
pub struct PanickingHistory {
    panicking: AtomicBool,
}

impl PanickingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }
}

#[async_trait]
impl HistoryQuery for PanickingHistory {
    async fn fetch_segments(
        &self,
        icao24: &str,
        _begin: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<FlightSegment>> {
        if self.panicking.load(Ordering::SeqCst) {
            panic!("history decoder blew up on {}", icao24);
        }
        Ok(vec![segment(Some("LLBG"), None)])
    }
}

pub fn pipeline_with<H: HistoryQuery + 'static>(
    region: Arc<StaticRegion>,
    history: Arc<H>,
    settings: PipelineSettings,
) -> RefreshPipeline {
    RefreshPipeline::new(
        region,
        history,
        Region::turkey(),
        FlaggedAirports::israel(),
        settings,
    )
}
