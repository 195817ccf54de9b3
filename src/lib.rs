//! skyfence - live aircraft geofencing against flagged-airport flight history
//!
//! A poller fetches live positions for a region from OpenSky, keeps the
//! aircraft inside the region polygon, looks up each one's recent flights,
//! and publishes the aircraft whose flights touch a flagged airport as an
//! immutable snapshot served over HTTP.

pub mod actions;
pub mod airports;
pub mod config;
pub mod flights;
pub mod metrics;
pub mod opensky_client;
pub mod poll_loop;
pub mod position;
pub mod refresh_pipeline;
pub mod region;
pub mod snapshot;
pub mod snapshot_cache;
pub mod upstream;
pub mod web;

pub use airports::FlaggedAirports;
pub use config::AppConfig;
pub use flights::FlightSegment;
pub use opensky_client::{OpenSkyClient, OpenSkyCredentials};
pub use poll_loop::{Backoff, PollLoop, RefreshOutcome, refresh_and_publish};
pub use position::Position;
pub use refresh_pipeline::{Pass, PipelineSettings, RefreshPipeline};
pub use region::{BoundingBox, Region, RegionFile};
pub use snapshot::{MatchResult, PassStats, Snapshot};
pub use snapshot_cache::SnapshotCache;
pub use upstream::{HistoryQuery, RegionQuery};
