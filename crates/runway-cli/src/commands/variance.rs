//! Variance command

use anyhow::{Context, Result};

use runway_core::{decompose_variance, CsvStore, VarianceSummary};

use super::fmt_money;

pub fn cmd_variance(store: &CsvStore, json: bool) -> Result<VarianceSummary> {
    let revenue = store.read_revenue().context("Failed to read revenue table")?;
    let opex = store.read_opex().context("Failed to read opex table")?;

    let summary = decompose_variance(&revenue, &opex).context("Variance decomposition failed")?;
    let path = store
        .write_variance_summary(&summary)
        .context("Failed to write variance summary")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(summary);
    }

    println!();
    println!("📈 Month-over-Month Variance");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Revenue change:  {:>18}", fmt_money(summary.revenue_change));
    println!("   Opex change:     {:>18}", fmt_money(summary.opex_change));
    println!("   Margin change:   {:>18}", fmt_money(summary.margin_change));
    println!();
    println!(
        "   Top region:      {} ({})",
        summary.top_region_driver,
        fmt_money(summary.top_region_delta)
    );
    println!("   Written to {}", path.display());
    println!();

    Ok(summary)
}
