use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing::{error, info};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder
///
/// Safe to call more than once; later calls return the first handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle);
    }

    // Buckets: 50ms .. 2min, passes are dominated by per-aircraft history lookups
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("pass_duration_ms".to_string()),
            &[
                50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0,
                120000.0,
            ],
        )
        .context("Failed to set buckets for pass duration")?
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    Ok(METRICS_HANDLE.get_or_init(|| handle))
}

/// Register refresh metrics at zero so they show up before the first pass
pub fn initialize_refresh_metrics() {
    metrics::counter!("refresh.passes_total").absolute(0);
    metrics::counter!("refresh.region_failures_total").absolute(0);
    metrics::counter!("refresh.history_failures_total").absolute(0);
    metrics::counter!("refresh.internal_failures_total").absolute(0);
    metrics::counter!("refresh.matches_total").absolute(0);
    metrics::gauge!("refresh.candidates").set(0.0);
    metrics::gauge!("refresh.matches").set(0.0);
    metrics::gauge!("poll.backoff_seconds").set(0.0);
}

/// Update uptime every 5 seconds
pub async fn process_metrics_task() {
    let start_time = Instant::now();

    loop {
        metrics::gauge!("process.uptime.seconds").set(start_time.elapsed().as_secs_f64());
        metrics::gauge!("process.is_up").set(1.0);
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}

/// Serve `/metrics` on its own port
pub async fn start_metrics_server(port: u16) -> Result<()> {
    let handle = init_metrics()?;
    initialize_refresh_metrics();
    tokio::spawn(process_metrics_task());

    let app = Router::new().route("/metrics", get(move || async move { handle.render() }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics server on {}", addr))?;
    info!("Metrics server listening on http://{}/metrics", addr);

    axum::serve(listener, app)
        .await
        .context("Metrics server failed")
}

/// Spawn the metrics server and log if it ever exits
pub fn spawn_metrics_server(port: u16) {
    tokio::spawn(async move {
        match start_metrics_server(port).await {
            Ok(()) => error!("Metrics server exited unexpectedly"),
            Err(e) => error!("Metrics server failed: {:#}", e),
        }
    });
}
