//! Seeded synthetic company financials
//!
//! Produces the four raw tables for a monthly range. Revenue follows a base
//! per product, scaled by region, seasonality, the growth index and a random
//! shock. Opex is derived from revenue and people cost, so the tables move
//! together the way a real P&L does.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::info;

use crate::config::SyntheticConfig;
use crate::error::{Error, Result};
use crate::models::{HeadcountRecord, MacroRecord, Month, OpexRecord, RawTables, RevenueRecord};

/// Product lines and their base monthly revenue
pub const PRODUCTS: [(&str, f64); 3] = [
    ("Core", 450_000.0),
    ("Plus", 220_000.0),
    ("Enterprise", 160_000.0),
];

/// Regions and their revenue multipliers
pub const REGIONS: [(&str, f64); 3] = [("NA", 1.15), ("EMEA", 0.95), ("APAC", 0.85)];

/// Departments: (name, starting headcount, average monthly cost per head)
pub const DEPARTMENTS: [(&str, f64, f64); 4] = [
    ("Engineering", 120.0, 17_000.0),
    ("Sales", 80.0, 16_000.0),
    ("Marketing", 40.0, 14_000.0),
    ("G&A", 30.0, 13_000.0),
];

/// Opex categories in output order
pub const OPEX_CATEGORIES: [&str; 4] = ["Cloud", "Sales", "Marketing", "G&A"];

/// Headcount added per department over the whole range
const HEADCOUNT_TREND: f64 = 35.0;
/// Seasonality amplitude; four full cycles over the range
const SEASON_AMPLITUDE: f64 = 0.06;
const SEASON_CYCLES: f64 = 4.0;

/// Generate all four raw tables for `config`
///
/// Identical seeds and ranges give identical tables.
pub fn generate_synthetic_tables(config: &SyntheticConfig) -> Result<RawTables> {
    let months = Month::range(config.start, config.end);
    if months.is_empty() {
        return Err(Error::InvalidData(format!(
            "empty synthetic range {}..{}",
            config.start, config.end
        )));
    }
    let n = months.len();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let inflation = random_walk(&mut rng, n, 0.15, 0.25)?;
    let growth = random_walk(&mut rng, n, 0.2, 0.35)?;
    let macro_drivers: Vec<MacroRecord> = months
        .iter()
        .zip(inflation.iter().zip(&growth))
        .map(|(&month, (&inflation_idx, &growth_idx))| MacroRecord {
            month,
            inflation_idx,
            growth_idx,
        })
        .collect();

    let headcount_noise = normal(0.0, 3.0)?;
    let mut headcount = Vec::with_capacity(DEPARTMENTS.len() * n);
    let mut people_cost = vec![0.0; n];
    for (department, base, avg_cost) in DEPARTMENTS {
        for (i, &month) in months.iter().enumerate() {
            let raw =
                base + linspace(0.0, HEADCOUNT_TREND, n, i) + headcount_noise.sample(&mut rng);
            // Truncates toward zero after clamping, like an integer cast
            let heads = raw.max(0.0) as u32;
            people_cost[i] += f64::from(heads) * avg_cost;
            headcount.push(HeadcountRecord {
                month,
                department: department.to_string(),
                headcount: heads,
                avg_monthly_cost: avg_cost,
            });
        }
    }

    let shock = normal(0.0, 0.03)?;
    let season_end = 2.0 * SEASON_CYCLES * std::f64::consts::PI;
    let mut revenue = Vec::with_capacity(PRODUCTS.len() * REGIONS.len() * n);
    let mut total_revenue = vec![0.0; n];
    for (product, base) in PRODUCTS {
        for (region, region_mult) in REGIONS {
            for (i, &month) in months.iter().enumerate() {
                let season = 1.0 + SEASON_AMPLITUDE * linspace(0.0, season_end, n, i).sin();
                let macro_effect = (growth[i] - 100.0) / 200.0;
                let amount = round_cents(
                    base * region_mult * season * (1.0 + macro_effect + shock.sample(&mut rng)),
                );
                total_revenue[i] += amount;
                revenue.push(RevenueRecord {
                    month,
                    product: product.to_string(),
                    region: region.to_string(),
                    revenue: amount,
                });
            }
        }
    }

    let mut opex = Vec::with_capacity(OPEX_CATEGORIES.len() * n);
    for category in OPEX_CATEGORIES {
        for (i, &month) in months.iter().enumerate() {
            let price_level = inflation[i] / 100.0;
            let spend = match category {
                "Cloud" => 0.13 * total_revenue[i] * price_level,
                "Sales" => 0.10 * total_revenue[i],
                "Marketing" => 0.06 * total_revenue[i],
                _ => 0.22 * people_cost[i] * price_level,
            };
            opex.push(OpexRecord {
                month,
                category: category.to_string(),
                opex: round_cents(spend),
            });
        }
    }

    info!(
        seed = config.seed,
        months = n,
        revenue_rows = revenue.len(),
        opex_rows = opex.len(),
        "Generated synthetic tables"
    );

    Ok(RawTables {
        revenue,
        opex,
        headcount,
        macro_drivers,
    })
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std_dev)
        .map_err(|e| Error::InvalidData(format!("normal distribution: {}", e)))
}

/// Index level starting near 100 and drifting by normal steps
fn random_walk(rng: &mut StdRng, n: usize, drift: f64, volatility: f64) -> Result<Vec<f64>> {
    let step = normal(drift, volatility)?;
    let mut level = 100.0;
    Ok((0..n)
        .map(|_| {
            level += step.sample(&mut *rng);
            level
        })
        .collect())
}

/// The `i`th of `n` evenly spaced points from `start` to `end` inclusive
fn linspace(start: f64, end: f64, n: usize, i: usize) -> f64 {
    if n <= 1 {
        return start;
    }
    start + (end - start) * i as f64 / (n - 1) as f64
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
