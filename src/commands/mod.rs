pub mod check;
pub mod run;

pub use check::handle_check;
pub use run::handle_run;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use skyfence::airports::FlaggedAirports;
use skyfence::config::AppConfig;
use skyfence::opensky_client::OpenSkyClient;
use skyfence::refresh_pipeline::{PipelineSettings, RefreshPipeline};
use skyfence::region::{Region, RegionFile};

/// Region and flagged prefixes from REGION_CONFIG, or the built-in Turkey/Israel defaults
fn load_region(config: &AppConfig) -> Result<(Region, FlaggedAirports)> {
    match &config.region_config {
        Some(path) => {
            let file = RegionFile::load(path)?;
            let region = file
                .region()
                .with_context(|| format!("Invalid region in {:?}", path))?;
            let flagged = FlaggedAirports::new(&file.flagged_prefixes)
                .with_context(|| format!("Invalid flagged_prefixes in {:?}", path))?;
            info!(
                "Loaded region {:?} from {:?} ({} vertices)",
                region.name(),
                path,
                file.vertices.len()
            );
            Ok((region, flagged))
        }
        None => Ok((Region::turkey(), FlaggedAirports::israel())),
    }
}

pub(crate) fn build_pipeline(config: &AppConfig) -> Result<RefreshPipeline> {
    let (region, flagged) = load_region(config)?;

    let client = Arc::new(OpenSkyClient::new(
        config.opensky_base_url.clone(),
        config.credentials.clone(),
        config.upstream_timeout,
    )?);

    let settings = PipelineSettings {
        candidate_cap: config.candidate_cap,
        lookback: config.lookback,
        history_concurrency: config.history_concurrency,
    };

    info!(
        "Watching region {:?} for flights touching {:?} (cap {}, lookback {}h)",
        region.name(),
        flagged.prefixes(),
        settings.candidate_cap,
        settings.lookback.num_hours()
    );

    Ok(RefreshPipeline::new(
        client.clone(),
        client,
        region,
        flagged,
        settings,
    ))
}
