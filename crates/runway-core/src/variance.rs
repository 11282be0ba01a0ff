//! Month-over-month variance decomposition
//!
//! Compares the two most recent months in the revenue table and attributes
//! the revenue change to the region whose revenue grew the most.
//!
//! The region driver is the `argmax` of the *signed* delta: a region that
//! shrank the least beats one that shrank more, and when every region fell
//! the least-negative one is still reported. Regions are scanned in
//! lexicographic order and a later region only replaces the current winner
//! when its delta is strictly greater, so exact ties go to the region whose
//! name sorts first.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Month, OpexRecord, RevenueRecord, VarianceSummary};

/// Decompose the change between the two latest months in `revenue`
pub fn decompose_variance(
    revenue: &[RevenueRecord],
    opex: &[OpexRecord],
) -> Result<VarianceSummary> {
    let (m0, m1) = latest_two_months(revenue)?;
    debug!(m0 = %m0, m1 = %m1, "Comparing months");

    let r0 = total_revenue(revenue, m0);
    let r1 = total_revenue(revenue, m1);
    let o0 = total_opex(opex, m0);
    let o1 = total_opex(opex, m1);

    let (top_region_driver, top_region_delta) = top_region(revenue, m0, m1)?;

    let summary = VarianceSummary {
        revenue_change: r1 - r0,
        opex_change: o1 - o0,
        margin_change: (r1 - o1) - (r0 - o0),
        top_region_driver,
        top_region_delta,
    };

    info!(
        revenue_change = summary.revenue_change,
        opex_change = summary.opex_change,
        margin_change = summary.margin_change,
        top_region = %summary.top_region_driver,
        "Variance decomposition complete"
    );

    Ok(summary)
}

/// The two most recent distinct months, earlier first
pub fn latest_two_months(revenue: &[RevenueRecord]) -> Result<(Month, Month)> {
    let months: BTreeSet<Month> = revenue.iter().map(|r| r.month).collect();
    let mut latest = months.iter().rev();

    match (latest.next(), latest.next()) {
        (Some(&m1), Some(&m0)) => Ok((m0, m1)),
        _ => Err(Error::InsufficientHistory {
            context: "variance decomposition (distinct revenue months)",
            required: 2,
            found: months.len(),
        }),
    }
}

fn total_revenue(revenue: &[RevenueRecord], month: Month) -> f64 {
    revenue
        .iter()
        .filter(|r| r.month == month)
        .map(|r| r.revenue)
        .sum()
}

fn total_opex(opex: &[OpexRecord], month: Month) -> f64 {
    opex.iter()
        .filter(|o| o.month == month)
        .map(|o| o.opex)
        .sum()
}

/// Per-region signed deltas between `m0` and `m1`, keyed by region name
///
/// Every region seen anywhere in the table is present; a region with no rows
/// in one of the two months counts as zero revenue for that month.
pub fn region_deltas(revenue: &[RevenueRecord], m0: Month, m1: Month) -> BTreeMap<String, f64> {
    let mut by_region: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for r in revenue {
        let entry = by_region.entry(r.region.clone()).or_insert((0.0, 0.0));
        if r.month == m0 {
            entry.0 += r.revenue;
        } else if r.month == m1 {
            entry.1 += r.revenue;
        }
    }

    by_region
        .into_iter()
        .map(|(region, (before, after))| (region, after - before))
        .collect()
}

fn top_region(revenue: &[RevenueRecord], m0: Month, m1: Month) -> Result<(String, f64)> {
    let deltas = region_deltas(revenue, m0, m1);

    let mut best: Option<(&String, f64)> = None;
    for (region, &delta) in &deltas {
        debug!(region = %region, delta, "Region delta");
        match best {
            Some((_, best_delta)) if delta <= best_delta => {}
            _ => best = Some((region, delta)),
        }
    }

    best.map(|(region, delta)| (region.clone(), delta))
        .ok_or_else(|| Error::InvalidData("Revenue table has no regions".into()))
}
