//! Runway CLI - Monthly FP&A pipeline
//!
//! Usage:
//!   runway generate              Write synthetic raw tables
//!   runway features              Build the feature table
//!   runway variance              Month-over-month variance by region
//!   runway forecast              Holdout accuracy and next-month forecast
//!   runway narrate               CFO narrative for the latest variance
//!   runway run --generate        Everything above, in order

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use runway_core::RunwayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let mut config = RunwayConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(source) = &config.source {
        tracing::debug!(path = %source.display(), "Using config file");
    }
    let store = commands::open_store(&config, cli.data_dir.as_deref());

    match cli.command {
        Commands::Generate { seed } => {
            if let Some(seed) = seed {
                config.synthetic.seed = seed;
            }
            commands::cmd_generate(&store, &config.synthetic, cli.json)
        }
        Commands::Features => commands::cmd_features(&store, cli.json),
        Commands::Variance => commands::cmd_variance(&store, cli.json).map(|_| ()),
        Commands::Forecast { holdout } => {
            if let Some(holdout) = holdout {
                config.forecast.holdout_months = holdout;
            }
            commands::cmd_forecast(&store, &config.forecast, cli.json).map(|_| ())
        }
        Commands::Narrate { model } => {
            let client = commands::resolve_client(model.as_deref())?;
            commands::ensure_backend(&client).await?;
            commands::cmd_narrate(&store, &config.narrative, client, cli.json)
                .await
                .map(|_| ())
        }
        Commands::Run {
            generate,
            no_narrative,
            model,
        } => {
            // Backend must resolve and answer before any stage writes output
            let client = if no_narrative {
                None
            } else {
                Some(commands::resolve_client(model.as_deref())?)
            };
            commands::cmd_run(&store, &config, generate, client, cli.json).await
        }
    }
}
