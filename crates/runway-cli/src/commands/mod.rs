//! CLI command implementations
//!
//! Commands are organized by pipeline stage:
//! - `data` - Synthetic data generation and the feature table
//! - `variance` - Month-over-month variance decomposition
//! - `forecast` - Driver model accuracy and next-month forecast
//! - `narrate` - Executive narrative via the configured text backend
//! - `run` - All stages in order

pub mod data;
pub mod forecast;
pub mod narrate;
pub mod run;
pub mod variance;

// Re-export command functions for main.rs
pub use data::*;
pub use forecast::*;
pub use narrate::*;
pub use run::*;
pub use variance::*;

use std::path::Path;

use runway_core::{CsvStore, RunwayConfig};

/// Open the CSV store, letting `--data-dir` override the configured paths
pub fn open_store(config: &RunwayConfig, data_dir: Option<&Path>) -> CsvStore {
    match data_dir {
        Some(dir) => CsvStore::new(dir.join("raw"), dir.join("processed")),
        None => CsvStore::new(&config.data.raw_dir, &config.data.processed_dir),
    }
}

/// Format an amount with a sign, thousands separators and cents
pub fn fmt_money(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((&fixed, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}
