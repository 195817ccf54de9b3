use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flights::FlightSegment;
use crate::position::Position;

/// An in-region aircraft with at least one flagged flight leg
///
/// Built once per pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub icao24: String,
    pub callsign: Option<String>,
    pub lon: f64,
    pub lat: f64,
    /// Metres, truncated
    pub altitude: i64,
    /// Metres per second, truncated
    pub speed: i64,
    /// Degrees, truncated
    pub heading: i64,
    pub origin_country: String,
    pub matched_flights: Vec<FlightSegment>,
    /// Capture time, epoch seconds
    pub timestamp: f64,
    /// Capture time
    pub last_seen: DateTime<Utc>,
}

impl MatchResult {
    pub fn new(
        position: &Position,
        matched_flights: Vec<FlightSegment>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            icao24: position.icao24.clone(),
            callsign: position.callsign.clone(),
            lon: position.longitude,
            lat: position.latitude,
            altitude: position.altitude_m as i64,
            speed: position.velocity_mps as i64,
            heading: position.heading_deg as i64,
            origin_country: position.origin_country.clone(),
            matched_flights,
            timestamp: captured_at.timestamp_millis() as f64 / 1000.0,
            last_seen: captured_at,
        }
    }
}

/// Counters describing how a pass went
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    /// Positions returned by the region source
    pub positions_fetched: usize,
    /// Positions inside the exact polygon, before the cap
    pub in_region: usize,
    /// Positions whose history was queried
    pub candidates: usize,
    /// History queries that failed and were treated as empty
    pub history_failures: usize,
    pub matches: usize,
}

/// The latest published pass
///
/// `fetched_at` is `None` until the first pass completes. An unwarmed snapshot
/// means "no data yet", not "zero matches".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub fetched_at: Option<DateTime<Utc>>,
    pub results: Vec<MatchResult>,
    pub stats: PassStats,
    /// False when history came from an anonymous source and matches may be undercounted
    pub history_authenticated: bool,
}

impl Snapshot {
    pub fn is_warm(&self) -> bool {
        self.fetched_at.is_some()
    }

    /// Epoch seconds of the last completed pass, 0 before warm-up
    pub fn fetched_at_epoch(&self) -> i64 {
        self.fetched_at.map(|t| t.timestamp()).unwrap_or(0)
    }

    /// Seconds since the last completed pass, `None` before warm-up
    pub fn age_seconds(&self, now: DateTime<Utc>) -> Option<f64> {
        self.fetched_at
            .map(|t| (now - t).num_milliseconds().max(0) as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_match_result_truncates_kinematics() {
        let position = Position::new("4baa8f", Some("THY1AB"), "Turkey", 32.8, 39.9)
            .with_altitude(Some(10972.9))
            .with_velocity(Some(231.7))
            .with_heading(Some(145.99));
        let captured_at = Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap();

        let result = MatchResult::new(&position, Vec::new(), captured_at);

        assert_eq!(result.altitude, 10972);
        assert_eq!(result.speed, 231);
        assert_eq!(result.heading, 145);
        assert_eq!(result.timestamp, 1_700_000_000.5);
        assert_eq!(result.last_seen, captured_at);
    }

    #[test]
    fn test_default_snapshot_is_not_warm() {
        let snapshot = Snapshot::default();

        assert!(!snapshot.is_warm());
        assert_eq!(snapshot.fetched_at_epoch(), 0);
        assert_eq!(snapshot.age_seconds(Utc::now()), None);
    }

    #[test]
    fn test_age_seconds() {
        let fetched_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let snapshot = Snapshot {
            fetched_at: Some(fetched_at),
            ..Default::default()
        };

        let now = fetched_at + chrono::Duration::seconds(42);
        assert_eq!(snapshot.age_seconds(now), Some(42.0));
        assert_eq!(snapshot.fetched_at_epoch(), 1_700_000_000);
    }
}
