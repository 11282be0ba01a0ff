//! Feature table assembly
//!
//! Aggregates the raw tables into one row per month. Months that are missing
//! from any of the revenue, opex, headcount or macro tables are dropped, so the
//! output only covers months where every driver is known.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::models::{FeatureRow, Month, RawTables};

/// Build the monthly feature table, sorted by month
pub fn build_feature_table(raw: &RawTables) -> Vec<FeatureRow> {
    let mut revenue: BTreeMap<Month, f64> = BTreeMap::new();
    for r in &raw.revenue {
        *revenue.entry(r.month).or_default() += r.revenue;
    }

    let mut opex: BTreeMap<Month, f64> = BTreeMap::new();
    for o in &raw.opex {
        *opex.entry(o.month).or_default() += o.opex;
    }

    let mut headcount: BTreeMap<Month, u64> = BTreeMap::new();
    for h in &raw.headcount {
        *headcount.entry(h.month).or_default() += u64::from(h.headcount);
    }

    let mut macro_by_month = BTreeMap::new();
    for m in &raw.macro_drivers {
        if macro_by_month.insert(m.month, m).is_some() {
            warn!(month = %m.month, "Duplicate macro row, keeping the last one");
        }
    }

    let mut rows = Vec::with_capacity(revenue.len());
    for (month, total_revenue) in &revenue {
        let (Some(total_opex), Some(total_headcount), Some(macro_row)) = (
            opex.get(month),
            headcount.get(month),
            macro_by_month.get(month),
        ) else {
            debug!(month = %month, "Month missing from a driver table, dropping");
            continue;
        };

        let row = FeatureRow::new(
            *month,
            *total_revenue,
            *total_opex,
            *total_headcount as f64,
            macro_row.inflation_idx,
            macro_row.growth_idx,
        );

        if row.margin_pct.is_none() {
            warn!(month = %month, "Zero revenue, margin_pct is undefined");
        }

        rows.push(row);
    }

    info!(months = rows.len(), "Feature table built");
    rows
}
