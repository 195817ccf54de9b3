//! Upstream data source boundaries
//!
//! The refresh pipeline only sees these two traits. Both are treated as unreliable:
//! an `Err` from either is absorbed by the pipeline and never aborts a pass.
//!
//! - [`RegionQuery`]: all live aircraft state inside a bounding box
//! - [`HistoryQuery`]: one aircraft's recent flight legs within a time window

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::flights::FlightSegment;
use crate::position::Position;
use crate::region::BoundingBox;

#[async_trait]
pub trait RegionQuery: Send + Sync {
    /// Fetch every known aircraft position inside `bbox`
    ///
    /// Returning positions outside the box is allowed; the pipeline re-checks
    /// membership against the exact polygon.
    async fn fetch_positions(&self, bbox: &BoundingBox) -> Result<Vec<Position>>;
}

#[async_trait]
pub trait HistoryQuery: Send + Sync {
    /// Fetch flight legs for `icao24` seen between `begin` and `end`
    async fn fetch_segments(
        &self,
        icao24: &str,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FlightSegment>>;

    /// Whether the source runs with credentials
    ///
    /// Anonymous history access is heavily rate limited, so results from an
    /// unauthenticated source may undercount matches.
    fn is_authenticated(&self) -> bool {
        true
    }
}
