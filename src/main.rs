mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use skyfence::config::AppConfig;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser)]
#[command(name = "skyfence")]
#[command(about = "Flag aircraft in a region whose recent flights touch flagged airports")]
#[command(version = env!("VERGEN_GIT_DESCRIBE"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the background poller and the HTTP API
    Run {
        /// Interface to bind to (overrides INTERFACE)
        #[arg(long)]
        interface: Option<String>,

        /// Port to bind to (overrides PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Region definition TOML file (overrides REGION_CONFIG)
        #[arg(long)]
        region_config: Option<PathBuf>,
    },
    /// Run a single refresh pass and print the snapshot as JSON
    Check {
        /// Region definition TOML file (overrides REGION_CONFIG)
        #[arg(long)]
        region_config: Option<PathBuf>,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,skyfence=info"));

    // Only warnings and errors become Sentry events; info is kept as breadcrumbs
    let sentry_layer = sentry_tracing::layer().event_filter(|metadata| match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(sentry_layer.with_filter(filter::LevelFilter::INFO))
        .init();
}

fn init_sentry(dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = dsn?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: Some(env!("VERGEN_GIT_DESCRIBE").into()),
            attach_stacktrace: true,
            ..Default::default()
        },
    )))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Invalid configuration")?;

    // The guard flushes pending events on drop, so it lives for all of main
    let _sentry = init_sentry(config.sentry_dsn.as_deref());
    init_tracing();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Run {
                interface,
                port,
                region_config,
            } => {
                let mut config = config;
                if let Some(interface) = interface {
                    config.interface = interface;
                }
                if let Some(port) = port {
                    config.port = port;
                }
                if region_config.is_some() {
                    config.region_config = region_config;
                }
                commands::handle_run(config).await
            }
            Commands::Check { region_config } => {
                let mut config = config;
                if region_config.is_some() {
                    config.region_config = region_config;
                }
                commands::handle_check(config).await
            }
        }
    })
}
