use anyhow::{Context, Result, bail};
use tracing::info;

use skyfence::config::AppConfig;

/// One pass against the live upstream, printed to stdout
pub async fn handle_check(config: AppConfig) -> Result<()> {
    let pipeline = super::build_pipeline(&config)?;
    let pass = pipeline.run_pass().await?;

    if !pass.region_available {
        bail!("Region source unavailable, no snapshot produced");
    }

    info!(
        "Pass found {} matches among {} candidates ({} history failures)",
        pass.stats.matches, pass.stats.candidates, pass.stats.history_failures
    );

    let snapshot = pass.into_snapshot();
    let json = serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?;
    println!("{}", json);
    Ok(())
}
