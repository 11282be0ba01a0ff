//! Forecast command

use anyhow::{Context, Result};
use serde_json::json;

use runway_core::forecast::{run_baseline_forecast, ForecastConfig, ForecastRun};
use runway_core::CsvStore;

use super::fmt_money;

pub fn cmd_forecast(store: &CsvStore, config: &ForecastConfig, json: bool) -> Result<ForecastRun> {
    let rows = store.read_feature_table().with_context(|| {
        format!(
            "Failed to read feature table from {} (run `runway features` first?)",
            store.processed_dir().display()
        )
    })?;

    let run = run_baseline_forecast(&rows, config).context("Forecast failed")?;
    let path = store
        .write_forecast(&run.forecast)
        .context("Failed to write forecast")?;

    if json {
        let output = json!({
            "train_months": run.train_months,
            "test_months": run.test_months,
            "accuracy": run.accuracy,
            "forecast": run.forecast,
            "models": run.models,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(run);
    }

    println!();
    println!(
        "🎯 Baseline Driver Model Accuracy ({} train / {} holdout months)",
        run.train_months, run.test_months
    );
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Revenue MAPE:  {:>8.2}%", run.accuracy.revenue_mape);
    println!("   Opex MAPE:     {:>8.2}%", run.accuracy.opex_mape);
    println!("   Margin MAPE:   {:>8.2}%", run.accuracy.margin_mape);
    println!();

    let f = &run.forecast;
    println!("🔮 Forecast for {}", f.month);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Revenue:  {:>18}", fmt_money(f.revenue_forecast));
    println!("   Opex:     {:>18}", fmt_money(f.opex_forecast));
    println!("   Margin:   {:>18}", fmt_money(f.margin_forecast));
    println!(
        "   Assumed drivers: headcount {:.1}, inflation {:.3}, growth {:.3}",
        f.assumed_headcount, f.assumed_inflation_idx, f.assumed_growth_idx
    );
    println!("   Written to {}", path.display());
    println!();

    Ok(run)
}
