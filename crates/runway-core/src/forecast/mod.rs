//! Driver-based forecasting
//!
//! Fits one linear model per target (revenue, opex) on the drivers
//! (headcount, inflation_idx, growth_idx), measures accuracy on a holdout
//! window of the most recent months, and projects one month past the latest
//! observed month.
//!
//! # Pipeline
//!
//! 1. Sort the feature table by month and validate every driver and target
//! 2. Split off the last `holdout_months` rows (default 6) as the test window
//! 3. Train revenue and opex models on the remaining rows
//! 4. Score both models (and their implied margin) with MAPE on the holdout
//! 5. Scale the latest row's drivers by the forward assumptions and predict
//!
//! The forecast reuses the models trained in step 3; it does not refit on the
//! full history.

pub mod metrics;
pub mod ols;

pub use metrics::{mape, DEFAULT_MAPE_EPSILON};
pub use ols::LinearModel;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{AccuracyReport, FeatureRow, ForecastResult};

/// Default number of most recent months held out for evaluation
pub const DEFAULT_HOLDOUT_MONTHS: usize = 6;

/// Driver columns, in the order models consume them
pub const DRIVER_FEATURES: [DriverFeature; 3] = [
    DriverFeature::Headcount,
    DriverFeature::InflationIdx,
    DriverFeature::GrowthIdx,
];

/// A driver column of the feature table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverFeature {
    Headcount,
    InflationIdx,
    GrowthIdx,
}

impl DriverFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Headcount => "headcount",
            Self::InflationIdx => "inflation_idx",
            Self::GrowthIdx => "growth_idx",
        }
    }

    pub fn value(&self, row: &FeatureRow) -> f64 {
        match self {
            Self::Headcount => row.headcount,
            Self::InflationIdx => row.inflation_idx,
            Self::GrowthIdx => row.growth_idx,
        }
    }
}

/// A forecast target column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Revenue,
    Opex,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Opex => "opex",
        }
    }

    pub fn value(&self, row: &FeatureRow) -> f64 {
        match self {
            Self::Revenue => row.revenue,
            Self::Opex => row.opex,
        }
    }

    pub fn all() -> &'static [Target] {
        &[Self::Revenue, Self::Opex]
    }
}

/// Driver values fed to a model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriverVector {
    pub headcount: f64,
    pub inflation_idx: f64,
    pub growth_idx: f64,
}

impl DriverVector {
    pub fn from_row(row: &FeatureRow) -> Self {
        Self {
            headcount: row.headcount,
            inflation_idx: row.inflation_idx,
            growth_idx: row.growth_idx,
        }
    }

    /// Values ordered as `DRIVER_FEATURES`
    pub fn as_array(&self) -> [f64; 3] {
        [self.headcount, self.inflation_idx, self.growth_idx]
    }
}

/// Naive forward multipliers applied to the latest month's drivers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriverAssumptions {
    /// Headcount growth (default 1.01)
    pub headcount: f64,
    /// Inflation index drift (default 1.002)
    pub inflation_idx: f64,
    /// Growth index drift (default 1.003)
    pub growth_idx: f64,
}

impl Default for DriverAssumptions {
    fn default() -> Self {
        Self {
            headcount: 1.01,
            inflation_idx: 1.002,
            growth_idx: 1.003,
        }
    }
}

impl DriverAssumptions {
    /// Assumed next-period drivers for the given latest row
    pub fn apply(&self, latest: &FeatureRow) -> DriverVector {
        DriverVector {
            headcount: latest.headcount * self.headcount,
            inflation_idx: latest.inflation_idx * self.inflation_idx,
            growth_idx: latest.growth_idx * self.growth_idx,
        }
    }
}

/// Forecast engine settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastConfig {
    pub holdout_months: usize,
    pub mape_epsilon: f64,
    pub assumptions: DriverAssumptions,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            holdout_months: DEFAULT_HOLDOUT_MONTHS,
            mape_epsilon: DEFAULT_MAPE_EPSILON,
            assumptions: DriverAssumptions::default(),
        }
    }
}

/// The revenue and opex models of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverModels {
    pub revenue: LinearModel,
    pub opex: LinearModel,
}

impl DriverModels {
    /// Train both models on the same rows
    pub fn train(rows: &[FeatureRow]) -> Result<Self> {
        Ok(Self {
            revenue: LinearModel::fit(rows, Target::Revenue)?,
            opex: LinearModel::fit(rows, Target::Opex)?,
        })
    }

    pub fn model(&self, target: Target) -> &LinearModel {
        match target {
            Target::Revenue => &self.revenue,
            Target::Opex => &self.opex,
        }
    }
}

/// Everything produced by one baseline forecast run
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRun {
    pub models: DriverModels,
    pub accuracy: AccuracyReport,
    pub forecast: ForecastResult,
    pub train_months: usize,
    pub test_months: usize,
}

/// Train, evaluate and forecast from a feature table
pub fn run_baseline_forecast(rows: &[FeatureRow], config: &ForecastConfig) -> Result<ForecastRun> {
    let sorted = prepare_rows(rows)?;
    let (train, test) = split_holdout(&sorted, config.holdout_months)?;
    debug!(
        train_months = train.len(),
        test_months = test.len(),
        first_test = %test[0].month,
        "Split feature table"
    );

    let models = DriverModels::train(train)?;
    let accuracy = evaluate(&models, test, config.mape_epsilon)?;

    info!(
        revenue_mape = accuracy.revenue_mape,
        opex_mape = accuracy.opex_mape,
        margin_mape = accuracy.margin_mape,
        holdout_months = test.len(),
        "Baseline driver model accuracy"
    );

    let forecast = forecast_next_month(&sorted, &models, &config.assumptions)?;

    info!(
        month = %forecast.month,
        revenue = forecast.revenue_forecast,
        opex = forecast.opex_forecast,
        margin = forecast.margin_forecast,
        "Next-month forecast"
    );

    Ok(ForecastRun {
        models,
        accuracy,
        forecast,
        train_months: train.len(),
        test_months: test.len(),
    })
}

/// Sort rows by month, rejecting duplicate months and non-finite values
///
/// Non-finite drivers, targets or margins are how a missing cell arrives from a
/// loosely typed source, so they are reported as missing features.
pub fn prepare_rows(rows: &[FeatureRow]) -> Result<Vec<FeatureRow>> {
    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|r| r.month);

    for pair in sorted.windows(2) {
        if pair[0].month == pair[1].month {
            return Err(Error::InvalidData(format!(
                "Feature table has more than one row for {}",
                pair[0].month
            )));
        }
    }

    for row in &sorted {
        for feature in DRIVER_FEATURES {
            if !feature.value(row).is_finite() {
                return Err(Error::MissingFeature(format!(
                    "{} missing for {}",
                    feature.as_str(),
                    row.month
                )));
            }
        }
        for target in Target::all() {
            if !target.value(row).is_finite() {
                return Err(Error::MissingFeature(format!(
                    "{} missing for {}",
                    target.as_str(),
                    row.month
                )));
            }
        }
        // Margin is scored directly as the third actual
        if !row.margin.is_finite() {
            return Err(Error::MissingFeature(format!(
                "margin missing for {}",
                row.month
            )));
        }
    }

    Ok(sorted)
}

/// Split month-sorted rows into (train, test) with `holdout` test rows
///
/// At least one training row is required on top of the holdout window.
pub fn split_holdout(rows: &[FeatureRow], holdout: usize) -> Result<(&[FeatureRow], &[FeatureRow])> {
    if holdout == 0 {
        return Err(Error::InvalidData(
            "Holdout window must contain at least one month".into(),
        ));
    }

    let required = holdout + 1;
    if rows.len() < required {
        return Err(Error::InsufficientHistory {
            context: "forecast train/test split (feature rows)",
            required,
            found: rows.len(),
        });
    }

    Ok(rows.split_at(rows.len() - holdout))
}

/// Score trained models on held-out rows
pub fn evaluate(models: &DriverModels, test: &[FeatureRow], epsilon: f64) -> Result<AccuracyReport> {
    let revenue_pred: Vec<f64> = test.iter().map(|r| models.revenue.predict_row(r)).collect();
    let opex_pred: Vec<f64> = test.iter().map(|r| models.opex.predict_row(r)).collect();
    let margin_pred: Vec<f64> = revenue_pred
        .iter()
        .zip(&opex_pred)
        .map(|(r, o)| r - o)
        .collect();

    let revenue_actual: Vec<f64> = test.iter().map(|r| r.revenue).collect();
    let opex_actual: Vec<f64> = test.iter().map(|r| r.opex).collect();
    let margin_actual: Vec<f64> = test.iter().map(|r| r.margin).collect();

    Ok(AccuracyReport {
        revenue_mape: mape(&revenue_actual, &revenue_pred, epsilon)?,
        opex_mape: mape(&opex_actual, &opex_pred, epsilon)?,
        margin_mape: mape(&margin_actual, &margin_pred, epsilon)?,
    })
}

/// Forecast the month after the latest row using already-trained models
pub fn forecast_next_month(
    rows: &[FeatureRow],
    models: &DriverModels,
    assumptions: &DriverAssumptions,
) -> Result<ForecastResult> {
    let latest = rows
        .iter()
        .max_by_key(|r| r.month)
        .ok_or(Error::InsufficientHistory {
            context: "next-month forecast (feature rows)",
            required: 1,
            found: 0,
        })?;

    let month = latest.month.next().ok_or_else(|| {
        Error::InvalidData(format!("No calendar month follows {}", latest.month))
    })?;
    let assumed = assumptions.apply(latest);
    let revenue_forecast = models.revenue.predict(&assumed);
    let opex_forecast = models.opex.predict(&assumed);

    Ok(ForecastResult {
        month,
        revenue_forecast,
        opex_forecast,
        margin_forecast: revenue_forecast - opex_forecast,
        assumed_headcount: assumed.headcount,
        assumed_inflation_idx: assumed.inflation_idx,
        assumed_growth_idx: assumed.growth_idx,
    })
}
