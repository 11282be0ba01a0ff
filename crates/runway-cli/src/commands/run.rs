//! Full pipeline command

use anyhow::Result;
use tracing::info;

use runway_core::{AIClient, CsvStore, RunwayConfig};

use super::{
    cmd_features, cmd_forecast, cmd_generate, cmd_narrate, cmd_variance, ensure_backend,
};

/// Run every stage in order, stopping at the first failure
///
/// `client` is None only when the caller asked to skip the narrative. A
/// configured backend must pass its health check before any stage runs.
pub async fn cmd_run(
    store: &CsvStore,
    config: &RunwayConfig,
    generate: bool,
    client: Option<AIClient>,
    json: bool,
) -> Result<()> {
    if let Some(client) = &client {
        ensure_backend(client).await?;
    }

    if generate {
        cmd_generate(store, &config.synthetic, json)?;
    }

    cmd_features(store, json)?;
    cmd_variance(store, json)?;
    cmd_forecast(store, &config.forecast, json)?;

    match client {
        Some(client) => {
            cmd_narrate(store, &config.narrative, client, json).await?;
        }
        None => info!("Skipping narrative stage"),
    }

    if !json {
        println!("✅ Pipeline complete. Outputs in {}", store.processed_dir().display());
    }
    Ok(())
}
