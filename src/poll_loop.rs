//! Background refresh loop with error-adaptive backoff
//!
//! The loop has one piece of state, the current sleep interval:
//! - success: publish the snapshot, interval resets to the base
//! - failure: keep the previous snapshot, interval grows by the factor, clamped to [base, max]
//!
//! A pass counts as a failure when it escapes with an error or a panic, or when the
//! region source was unavailable. The loop never terminates on its own; cancel the
//! token to stop it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, warn};

use crate::refresh_pipeline::RefreshPipeline;
use crate::snapshot::Snapshot;
use crate::snapshot_cache::SnapshotCache;

pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    factor: f64,
    current: Duration,
}

impl Backoff {
    /// `max` below `base` is raised to `base`
    pub fn new(base: Duration, max: Duration, factor: f64) -> Self {
        Self {
            base,
            max: max.max(base),
            factor: factor.max(1.0),
            current: base,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn on_success(&mut self) -> Duration {
        self.current = self.base;
        self.current
    }

    pub fn on_failure(&mut self) -> Duration {
        let grown = self.current.mul_f64(self.factor);
        self.current = grown.clamp(self.base, self.max);
        self.current
    }
}

/// What happened when a pass was run and (maybe) published
#[derive(Debug)]
pub enum RefreshOutcome {
    Published(Arc<Snapshot>),
    /// The region source failed; the cache still holds the previous snapshot
    RegionUnavailable,
    /// Something escaped the pass; the cache still holds the previous snapshot
    Failed(anyhow::Error),
}

impl RefreshOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RefreshOutcome::Published(_))
    }
}

/// Run one pass and publish it if it produced region data
///
/// Shared by the background loop and forced refreshes from request handlers.
/// The snapshot is fully built before the cache lock is taken.
pub async fn refresh_and_publish(
    pipeline: &RefreshPipeline,
    cache: &SnapshotCache,
) -> RefreshOutcome {
    let pass = match AssertUnwindSafe(pipeline.run_pass()).catch_unwind().await {
        Ok(Ok(pass)) => pass,
        Ok(Err(e)) => {
            metrics::counter!("refresh.internal_failures_total").increment(1);
            return RefreshOutcome::Failed(e);
        }
        Err(panic) => {
            metrics::counter!("refresh.internal_failures_total").increment(1);
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            return RefreshOutcome::Failed(anyhow::anyhow!("Refresh pass panicked: {}", message));
        }
    };

    if !pass.region_available {
        return RefreshOutcome::RegionUnavailable;
    }

    RefreshOutcome::Published(cache.replace(pass.into_snapshot()))
}

pub struct PollLoop {
    pipeline: Arc<RefreshPipeline>,
    cache: SnapshotCache,
    backoff: Backoff,
}

impl PollLoop {
    pub fn new(pipeline: Arc<RefreshPipeline>, cache: SnapshotCache, backoff: Backoff) -> Self {
        Self {
            pipeline,
            cache,
            backoff,
        }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Run one pass, update the backoff, and return how long to sleep
    pub async fn poll_once(&mut self) -> Duration {
        let outcome = refresh_and_publish(&self.pipeline, &self.cache).await;

        let sleep = match outcome {
            RefreshOutcome::Published(snapshot) => {
                info!("Updated cache with {} flights", snapshot.results.len());
                self.backoff.on_success()
            }
            RefreshOutcome::RegionUnavailable => {
                let sleep = self.backoff.on_failure();
                warn!(
                    "Region source unavailable, keeping previous snapshot; next pass in {:?}",
                    sleep
                );
                sleep
            }
            RefreshOutcome::Failed(e) => {
                let sleep = self.backoff.on_failure();
                error!("Background poller error: {:#}; next pass in {:?}", e, sleep);
                sleep
            }
        };

        metrics::gauge!("poll.backoff_seconds").set(sleep.as_secs_f64());
        sleep
    }

    /// Poll until `cancel` fires
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Starting background poller (base {:?}, max {:?})",
            self.backoff.base(),
            self.backoff.max()
        );

        loop {
            let sleep = tokio::select! {
                _ = cancel.cancelled() => break,
                sleep = self.poll_once() => sleep,
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(sleep) => {}
            }
        }

        info!("Background poller stopped");
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel).instrument(tracing::info_span!("poll_loop")))
    }
}
