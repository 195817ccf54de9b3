use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::flights::FlightSegment;
use crate::position::Position;
use crate::region::BoundingBox;
use crate::upstream::{HistoryQuery, RegionQuery};

pub const DEFAULT_BASE_URL: &str = "https://opensky-network.org/api";

#[derive(Debug, Clone)]
pub struct OpenSkyCredentials {
    pub username: String,
    pub password: String,
}

/// OpenSky Network REST client
///
/// Serves as both the live-state source (`/states/all`) and the flight history
/// source (`/flights/aircraft`). History requires credentials to be reliable;
/// anonymous access works but is heavily rate limited.
pub struct OpenSkyClient {
    client: Client,
    base_url: String,
    credentials: Option<OpenSkyCredentials>,
}

/// `/states/all` response; `states` is null when nothing is in the box
#[derive(Debug, Deserialize)]
pub struct StatesResponse {
    pub time: Option<i64>,
    pub states: Option<Vec<Vec<Value>>>,
}

/// Single entry of a `/flights/aircraft` response
#[derive(Debug, Deserialize)]
pub struct OpenSkyFlight {
    pub icao24: Option<String>,
    pub callsign: Option<String>,
    #[serde(rename = "firstSeen")]
    pub first_seen: Option<i64>,
    #[serde(rename = "lastSeen")]
    pub last_seen: Option<i64>,
    #[serde(rename = "estDepartureAirport")]
    pub est_departure_airport: Option<String>,
    #[serde(rename = "estArrivalAirport")]
    pub est_arrival_airport: Option<String>,
}

impl From<OpenSkyFlight> for FlightSegment {
    fn from(flight: OpenSkyFlight) -> Self {
        Self {
            departure_airport: flight.est_departure_airport,
            arrival_airport: flight.est_arrival_airport,
            first_seen: flight.first_seen,
            last_seen: flight.last_seen,
        }
    }
}

// State vector field positions, see https://openskynetwork.github.io/opensky-api/rest.html
const STATE_ICAO24: usize = 0;
const STATE_CALLSIGN: usize = 1;
const STATE_ORIGIN_COUNTRY: usize = 2;
const STATE_LONGITUDE: usize = 5;
const STATE_LATITUDE: usize = 6;
const STATE_BARO_ALTITUDE: usize = 7;
const STATE_VELOCITY: usize = 9;
const STATE_TRUE_TRACK: usize = 10;
const STATE_GEO_ALTITUDE: usize = 13;

/// Convert one state vector into a position
///
/// Returns `None` for vectors without an identifier or without a position fix.
/// Geometric altitude is preferred over barometric.
pub fn parse_state_vector(state: &[Value]) -> Option<Position> {
    let field = |i: usize| state.get(i).and_then(Value::as_f64);

    let icao24 = state.get(STATE_ICAO24)?.as_str()?;
    let longitude = field(STATE_LONGITUDE)?;
    let latitude = field(STATE_LATITUDE)?;
    let callsign = state.get(STATE_CALLSIGN).and_then(Value::as_str);
    let origin_country = state
        .get(STATE_ORIGIN_COUNTRY)
        .and_then(Value::as_str)
        .unwrap_or_default();

    Some(
        Position::new(icao24, callsign, origin_country, longitude, latitude)
            .with_altitude(field(STATE_GEO_ALTITUDE).or(field(STATE_BARO_ALTITUDE)))
            .with_velocity(field(STATE_VELOCITY))
            .with_heading(field(STATE_TRUE_TRACK)),
    )
}

impl OpenSkyClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Option<OpenSkyCredentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("skyfence/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build OpenSky HTTP client")?;

        if credentials.is_some() {
            info!("OpenSky client configured with credentials");
        } else {
            warn!("OpenSky client has no credentials, flight history will be rate limited");
        }

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.credentials {
            Some(creds) => request.basic_auth(&creds.username, Some(&creds.password)),
            None => request,
        }
    }

    /// Fetch live state vectors inside a bounding box
    pub async fn get_states(&self, bbox: &BoundingBox) -> Result<StatesResponse> {
        let url = format!("{}/states/all", self.base_url);
        let params = [
            ("lamin", bbox.min_lat.to_string()),
            ("lomin", bbox.min_lon.to_string()),
            ("lamax", bbox.max_lat.to_string()),
            ("lomax", bbox.max_lon.to_string()),
        ];

        let response = self
            .get(&url)
            .query(&params)
            .send()
            .await
            .context("Failed to send request to OpenSky states endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenSky states error {}: {}", status, body);
        }

        response
            .json::<StatesResponse>()
            .await
            .context("Failed to parse OpenSky states response")
    }

    /// Fetch flights for one aircraft between `begin` and `end`
    ///
    /// OpenSky answers 404 when it has no flights in the window; that is an empty
    /// result, not an error.
    pub async fn get_flights_by_aircraft(
        &self,
        icao24: &str,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<OpenSkyFlight>> {
        let url = format!("{}/flights/aircraft", self.base_url);
        let params = [
            ("icao24", icao24.to_string()),
            ("begin", begin.timestamp().to_string()),
            ("end", end.timestamp().to_string()),
        ];

        let response = self
            .get(&url)
            .query(&params)
            .send()
            .await
            .with_context(|| format!("Failed to request flights for {}", icao24))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenSky flights error {} for {}: {}", status, icao24, body);
        }

        response
            .json::<Vec<OpenSkyFlight>>()
            .await
            .with_context(|| format!("Failed to parse flights for {}", icao24))
    }
}

#[async_trait]
impl RegionQuery for OpenSkyClient {
    async fn fetch_positions(&self, bbox: &BoundingBox) -> Result<Vec<Position>> {
        let response = self.get_states(bbox).await?;
        let states = response.states.unwrap_or_default();
        let total = states.len();

        let positions: Vec<Position> = states
            .iter()
            .filter_map(|state| parse_state_vector(state))
            .collect();

        debug!(
            "Parsed {} positions from {} state vectors (upstream time {:?})",
            positions.len(),
            total,
            response.time
        );
        Ok(positions)
    }
}

#[async_trait]
impl HistoryQuery for OpenSkyClient {
    async fn fetch_segments(
        &self,
        icao24: &str,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FlightSegment>> {
        let flights = self.get_flights_by_aircraft(icao24, begin, end).await?;
        Ok(flights.into_iter().map(FlightSegment::from).collect())
    }

    fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }
}
