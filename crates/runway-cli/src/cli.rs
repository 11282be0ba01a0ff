//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Runway - Monthly variance, driver forecast and CFO narrative
#[derive(Parser)]
#[command(name = "runway")]
#[command(about = "FP&A pipeline: variance decomposition, driver forecast, executive narrative", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ~/.config/runway/runway.toml, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory containing raw/ and processed/ (overrides config)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate synthetic raw tables (revenue, opex, headcount, macro drivers)
    Generate {
        /// Random seed (defaults to the configured seed)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Build the monthly feature table from the raw tables
    Features,

    /// Decompose the latest month-over-month change by region
    Variance,

    /// Train driver models, report holdout accuracy and forecast next month
    Forecast {
        /// Number of most recent months held out for evaluation
        #[arg(long)]
        holdout: Option<usize>,
    },

    /// Write an executive narrative for the latest variance summary
    ///
    /// The text backend is chosen from the environment (AI_BACKEND,
    /// OPENAI_API_KEY / OPENAI_COMPATIBLE_HOST, OLLAMA_HOST).
    Narrate {
        /// Model override for the configured backend
        #[arg(long)]
        model: Option<String>,
    },

    /// Run features, variance, forecast and narrative in order
    Run {
        /// Regenerate synthetic raw tables first
        #[arg(long)]
        generate: bool,

        /// Stop after the forecast stage
        #[arg(long)]
        no_narrative: bool,

        /// Model override for the configured backend
        #[arg(long)]
        model: Option<String>,
    },
}
