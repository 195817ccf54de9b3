use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use skyfence::config::AppConfig;
use skyfence::poll_loop::{Backoff, DEFAULT_BACKOFF_FACTOR, PollLoop};
use skyfence::snapshot_cache::SnapshotCache;
use skyfence::web::{self, AppState};

#[tracing::instrument(skip_all)]
pub async fn handle_run(config: AppConfig) -> Result<()> {
    sentry::configure_scope(|scope| {
        scope.set_tag("operation", "run");
    });

    if let Some(port) = config.metrics_port {
        skyfence::metrics::spawn_metrics_server(port);
    }

    let pipeline = Arc::new(super::build_pipeline(&config)?);
    let cache = SnapshotCache::new();
    let shutdown = CancellationToken::new();

    let backoff = Backoff::new(
        config.poll_interval,
        config.poll_max_interval,
        DEFAULT_BACKOFF_FACTOR,
    );
    let poller = PollLoop::new(pipeline.clone(), cache.clone(), backoff).spawn(shutdown.clone());

    // Ctrl+C stops the poller and drains the web server
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        signal_token.cancel();
    });

    let state = AppState {
        cache,
        pipeline,
        stale_after: config.stale_after,
    };
    let served = web::start_web_server(&config.interface, config.port, state, shutdown.clone()).await;

    // A bind failure returns before any signal; stop the poller either way
    shutdown.cancel();
    if let Err(e) = poller.await {
        warn!("Poller task ended abnormally: {}", e);
    }

    served
}
