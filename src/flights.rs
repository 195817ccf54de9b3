use serde::{Deserialize, Serialize};

use crate::airports::FlaggedAirports;

/// One historical flight leg for an aircraft
///
/// Airports are the upstream's estimates and may be missing, as may the times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSegment {
    #[serde(rename = "estDepartureAirport")]
    pub departure_airport: Option<String>,
    #[serde(rename = "estArrivalAirport")]
    pub arrival_airport: Option<String>,
    /// Epoch seconds
    #[serde(rename = "firstSeen")]
    pub first_seen: Option<i64>,
    #[serde(rename = "lastSeen")]
    pub last_seen: Option<i64>,
}

impl FlightSegment {
    pub fn touches(&self, flagged: &FlaggedAirports) -> bool {
        flagged.matches(self.departure_airport.as_deref())
            || flagged.matches(self.arrival_airport.as_deref())
    }
}

/// Keep the segments that depart from or arrive at a flagged airport
///
/// Output preserves input order. An empty result is the common case, not an error.
pub fn select_matches(segments: &[FlightSegment], flagged: &FlaggedAirports) -> Vec<FlightSegment> {
    segments
        .iter()
        .filter(|segment| segment.touches(flagged))
        .cloned()
        .collect()
}
