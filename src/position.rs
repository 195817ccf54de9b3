use serde::{Deserialize, Serialize};

/// A live aircraft state as reported by the region source
///
/// Positions only live for the duration of one refresh pass; nothing persists them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// ICAO 24-bit transponder address, lower-case hex
    pub icao24: String,
    /// Trimmed callsign; `None` when the transponder did not report one
    pub callsign: Option<String>,
    pub origin_country: String,
    /// WGS84 degrees
    pub longitude: f64,
    pub latitude: f64,
    /// Metres, 0 when unknown upstream
    pub altitude_m: f64,
    /// Metres per second, 0 when unknown upstream
    pub velocity_mps: f64,
    /// True track in degrees, 0 when unknown upstream
    pub heading_deg: f64,
}

impl Position {
    /// Build a position, normalizing the identifier and callsign the way every source must
    pub fn new(
        icao24: &str,
        callsign: Option<&str>,
        origin_country: &str,
        longitude: f64,
        latitude: f64,
    ) -> Self {
        Self {
            icao24: normalize_icao24(icao24),
            callsign: normalize_callsign(callsign),
            origin_country: origin_country.trim().to_string(),
            longitude,
            latitude,
            altitude_m: 0.0,
            velocity_mps: 0.0,
            heading_deg: 0.0,
        }
    }

    pub fn with_altitude(mut self, altitude_m: Option<f64>) -> Self {
        self.altitude_m = altitude_m.unwrap_or(0.0);
        self
    }

    pub fn with_velocity(mut self, velocity_mps: Option<f64>) -> Self {
        self.velocity_mps = velocity_mps.unwrap_or(0.0);
        self
    }

    pub fn with_heading(mut self, heading_deg: Option<f64>) -> Self {
        self.heading_deg = heading_deg.unwrap_or(0.0);
        self
    }
}

pub fn normalize_icao24(icao24: &str) -> String {
    icao24.trim().to_ascii_lowercase()
}

/// Callsigns arrive space-padded to 8 characters; blank means absent
pub fn normalize_callsign(callsign: Option<&str>) -> Option<String> {
    callsign
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}
