use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::opensky_client::{DEFAULT_BASE_URL, OpenSkyCredentials};

/// Process configuration, read from the environment (and `.env` via dotenvy)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Option<OpenSkyCredentials>,
    pub opensky_base_url: String,
    pub poll_interval: Duration,
    pub poll_max_interval: Duration,
    pub lookback: chrono::Duration,
    pub candidate_cap: usize,
    pub history_concurrency: usize,
    pub upstream_timeout: Duration,
    pub stale_after: Duration,
    pub interface: String,
    pub port: u16,
    pub region_config: Option<PathBuf>,
    pub metrics_port: Option<u16>,
    pub sentry_dsn: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let credentials = match (get("OPENSKY_USERNAME"), lookup("OPENSKY_PASSWORD")) {
            (Some(username), password) => Some(OpenSkyCredentials {
                username,
                password: password.unwrap_or_default(),
            }),
            (None, _) => None,
        };

        let poll_interval = Duration::from_secs(parse_or(&get, "POLL_INTERVAL", 20u64)?);
        let poll_max_interval = Duration::from_secs(parse_or(&get, "POLL_MAX_INTERVAL", 120u64)?);
        let lookback_hours: i64 = parse_or(&get, "RECENT_WINDOW_HOURS", 6)?;
        let candidate_cap: usize = parse_or(&get, "MAX_AIRCRAFT_TO_QUERY", 120)?;
        let history_concurrency: usize = parse_or(&get, "HISTORY_CONCURRENCY", 4)?;
        let upstream_timeout =
            Duration::from_secs(parse_or(&get, "UPSTREAM_TIMEOUT_SECONDS", 20u64)?);
        let stale_after = Duration::from_secs(parse_or(&get, "STALE_AFTER_SECONDS", 300u64)?);

        if poll_interval.is_zero() {
            bail!("POLL_INTERVAL must be at least 1 second");
        }
        if poll_max_interval < poll_interval {
            bail!(
                "POLL_MAX_INTERVAL ({}s) must not be below POLL_INTERVAL ({}s)",
                poll_max_interval.as_secs(),
                poll_interval.as_secs()
            );
        }
        if !(1..=24 * 30).contains(&lookback_hours) {
            bail!("RECENT_WINDOW_HOURS must be between 1 and 720");
        }
        if candidate_cap == 0 {
            bail!("MAX_AIRCRAFT_TO_QUERY must be at least 1");
        }
        if history_concurrency == 0 {
            bail!("HISTORY_CONCURRENCY must be at least 1");
        }
        if upstream_timeout.is_zero() {
            bail!("UPSTREAM_TIMEOUT_SECONDS must be at least 1");
        }

        let metrics_port = match get("METRICS_PORT") {
            Some(port) => Some(
                port.parse::<u16>()
                    .with_context(|| format!("Invalid METRICS_PORT {:?}", port))?,
            ),
            None => None,
        };

        Ok(Self {
            credentials,
            opensky_base_url: get("OPENSKY_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            poll_interval,
            poll_max_interval,
            lookback: chrono::Duration::hours(lookback_hours),
            candidate_cap,
            history_concurrency,
            upstream_timeout,
            stale_after,
            interface: get("INTERFACE").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 5000)?,
            region_config: get("REGION_CONFIG").map(PathBuf::from),
            metrics_port,
            sentry_dsn: get("SENTRY_DSN"),
        })
    }

    pub fn auth_configured(&self) -> bool {
        self.credentials.is_some()
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("Invalid {} value {:?}", key, value)),
        None => Ok(default),
    }
}
