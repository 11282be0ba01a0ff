//! Data commands (generate, features)

use anyhow::{Context, Result};
use serde_json::json;

use runway_core::{build_feature_table, generate_synthetic_tables, CsvStore, SyntheticConfig};

use super::fmt_money;

pub fn cmd_generate(store: &CsvStore, synthetic: &SyntheticConfig, json: bool) -> Result<()> {
    let tables = generate_synthetic_tables(synthetic).context("Failed to generate data")?;
    store
        .write_raw_tables(&tables)
        .with_context(|| format!("Failed to write raw tables to {}", store.raw_dir().display()))?;

    if json {
        let output = json!({
            "seed": synthetic.seed,
            "start": synthetic.start,
            "end": synthetic.end,
            "revenue_rows": tables.revenue.len(),
            "opex_rows": tables.opex.len(),
            "headcount_rows": tables.headcount.len(),
            "macro_rows": tables.macro_drivers.len(),
            "raw_dir": store.raw_dir(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("✅ Finance dataset generated!");
    println!("   Seed:      {}", synthetic.seed);
    println!("   Months:    {} to {}", synthetic.start, synthetic.end);
    println!("   Revenue:   {} rows", tables.revenue.len());
    println!("   Opex:      {} rows", tables.opex.len());
    println!("   Headcount: {} rows", tables.headcount.len());
    println!("   Macro:     {} rows", tables.macro_drivers.len());
    println!("   Written to {}", store.raw_dir().display());
    println!();

    Ok(())
}

pub fn cmd_features(store: &CsvStore, json: bool) -> Result<()> {
    let raw = store.read_raw_tables().with_context(|| {
        format!(
            "Failed to read raw tables from {} (run `runway generate` first?)",
            store.raw_dir().display()
        )
    })?;

    let rows = build_feature_table(&raw);
    let path = store
        .write_feature_table(&rows)
        .context("Failed to write feature table")?;

    if json {
        let output = json!({
            "months": rows.len(),
            "first_month": rows.first().map(|r| r.month),
            "last_month": rows.last().map(|r| r.month),
            "path": path,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("📋 Feature Table");
    println!("   ─────────────────────────────────────────────────────────────");
    match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => {
            println!("   Months:  {} ({} to {})", rows.len(), first.month, last.month);
            println!(
                "   Latest:  revenue {}  opex {}  margin {}",
                fmt_money(last.revenue),
                fmt_money(last.opex),
                fmt_money(last.margin)
            );
        }
        _ => println!("   No months present in every raw table"),
    }
    println!("   Written to {}", path.display());
    println!();

    Ok(())
}
