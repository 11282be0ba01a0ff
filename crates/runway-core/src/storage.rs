//! CSV storage adapter
//!
//! Thin file layer around the in-memory pipeline. Raw tables live in one
//! directory, derived tables in another:
//!
//! | File                      | Dir       | Contents                    |
//! |---------------------------|-----------|-----------------------------|
//! | `revenue_monthly.csv`     | raw       | month, product, region      |
//! | `opex_monthly.csv`        | raw       | month, category             |
//! | `headcount.csv`           | raw       | month, department           |
//! | `macro_drivers.csv`       | raw       | month, indices              |
//! | `training_table.csv`      | processed | feature table               |
//! | `variance_summary.csv`    | processed | single variance record      |
//! | `next_month_forecast.csv` | processed | single forecast record      |
//! | `cfo_narrative.csv`       | processed | executive narrative         |

use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{
    ExecutiveNarrative, FeatureRow, ForecastResult, HeadcountRecord, MacroRecord, Month,
    OpexRecord, RawTables, RevenueRecord, VarianceSummary,
};

pub const REVENUE_FILE: &str = "revenue_monthly.csv";
pub const OPEX_FILE: &str = "opex_monthly.csv";
pub const HEADCOUNT_FILE: &str = "headcount.csv";
pub const MACRO_FILE: &str = "macro_drivers.csv";
pub const FEATURE_TABLE_FILE: &str = "training_table.csv";
pub const VARIANCE_FILE: &str = "variance_summary.csv";
pub const FORECAST_FILE: &str = "next_month_forecast.csv";
pub const NARRATIVE_FILE: &str = "cfo_narrative.csv";

/// Columns the forecast engine needs from the feature table
pub const FEATURE_TABLE_COLUMNS: [&str; 7] = [
    "month",
    "revenue",
    "opex",
    "headcount",
    "inflation_idx",
    "growth_idx",
    "margin",
];

/// Raw and processed table locations
#[derive(Debug, Clone)]
pub struct CsvStore {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl CsvStore {
    pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    pub fn raw_path(&self, file: &str) -> PathBuf {
        self.raw_dir.join(file)
    }

    pub fn processed_path(&self, file: &str) -> PathBuf {
        self.processed_dir.join(file)
    }

    // ========== Raw tables ==========

    pub fn read_revenue(&self) -> Result<Vec<RevenueRecord>> {
        read_table(&self.raw_path(REVENUE_FILE))
    }

    pub fn read_opex(&self) -> Result<Vec<OpexRecord>> {
        read_table(&self.raw_path(OPEX_FILE))
    }

    pub fn read_raw_tables(&self) -> Result<RawTables> {
        Ok(RawTables {
            revenue: self.read_revenue()?,
            opex: self.read_opex()?,
            headcount: read_table::<HeadcountRecord>(&self.raw_path(HEADCOUNT_FILE))?,
            macro_drivers: read_table::<MacroRecord>(&self.raw_path(MACRO_FILE))?,
        })
    }

    pub fn write_raw_tables(&self, tables: &RawTables) -> Result<()> {
        write_table(&self.raw_path(REVENUE_FILE), &tables.revenue)?;
        write_table(&self.raw_path(OPEX_FILE), &tables.opex)?;
        write_table(&self.raw_path(HEADCOUNT_FILE), &tables.headcount)?;
        write_table(&self.raw_path(MACRO_FILE), &tables.macro_drivers)?;
        Ok(())
    }

    // ========== Processed tables ==========

    pub fn write_feature_table(&self, rows: &[FeatureRow]) -> Result<PathBuf> {
        let path = self.processed_path(FEATURE_TABLE_FILE);
        write_table(&path, rows)?;
        Ok(path)
    }

    pub fn read_feature_table(&self) -> Result<Vec<FeatureRow>> {
        read_feature_table(&self.processed_path(FEATURE_TABLE_FILE))
    }

    pub fn write_variance_summary(&self, summary: &VarianceSummary) -> Result<PathBuf> {
        let path = self.processed_path(VARIANCE_FILE);
        write_table(&path, std::slice::from_ref(summary))?;
        Ok(path)
    }

    pub fn read_variance_summary(&self) -> Result<VarianceSummary> {
        read_single(&self.processed_path(VARIANCE_FILE))
    }

    pub fn write_forecast(&self, forecast: &ForecastResult) -> Result<PathBuf> {
        let path = self.processed_path(FORECAST_FILE);
        write_table(&path, std::slice::from_ref(forecast))?;
        Ok(path)
    }

    pub fn read_forecast(&self) -> Result<ForecastResult> {
        read_single(&self.processed_path(FORECAST_FILE))
    }

    pub fn write_narrative(&self, narrative: &ExecutiveNarrative) -> Result<PathBuf> {
        let path = self.processed_path(NARRATIVE_FILE);
        write_table(&path, std::slice::from_ref(narrative))?;
        Ok(path)
    }

    pub fn read_narrative(&self) -> Result<ExecutiveNarrative> {
        read_single(&self.processed_path(NARRATIVE_FILE))
    }
}

/// Read every row of a headed CSV file
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| with_path(e, path))?;

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result.map_err(|e| with_path(e, path))?);
    }

    debug!(path = %path.display(), rows = rows.len(), "Read table");
    Ok(rows)
}

/// Write rows to a headed CSV file, creating the parent directory
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    debug!(path = %path.display(), rows = rows.len(), "Wrote table");
    Ok(())
}

fn read_single<T: DeserializeOwned>(path: &Path) -> Result<T> {
    read_table(path)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidData(format!("{} has no rows", path.display())))
}

fn with_path(err: csv::Error, path: &Path) -> Error {
    if err.is_io_error() {
        Error::InvalidData(format!("Cannot read {}: {}", path.display(), err))
    } else {
        Error::Csv(err)
    }
}

/// One feature table line before validation; every cell may be blank
#[derive(Debug, Deserialize)]
struct FeatureRecord {
    month: Month,
    revenue: Option<f64>,
    opex: Option<f64>,
    headcount: Option<f64>,
    inflation_idx: Option<f64>,
    growth_idx: Option<f64>,
    margin: Option<f64>,
}

/// Read and validate a feature table
///
/// A required column missing from the header, or a blank cell in one, is a
/// `MissingFeature` error naming the column (and the month for cells).
pub fn read_feature_table(path: &Path) -> Result<Vec<FeatureRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| with_path(e, path))?;

    let headers = rdr.headers()?.clone();
    check_columns(&headers)?;

    let mut rows = Vec::new();
    for result in rdr.deserialize::<FeatureRecord>() {
        let record = result?;
        rows.push(validate_feature_record(record)?);
    }

    debug!(path = %path.display(), rows = rows.len(), "Read feature table");
    Ok(rows)
}

fn check_columns(headers: &StringRecord) -> Result<()> {
    for column in FEATURE_TABLE_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(Error::MissingFeature(format!(
                "feature table has no '{}' column",
                column
            )));
        }
    }
    Ok(())
}

fn validate_feature_record(record: FeatureRecord) -> Result<FeatureRow> {
    let month = record.month;
    let require = |value: Option<f64>, column: &str| {
        value.ok_or_else(|| Error::MissingFeature(format!("{} missing for {}", column, month)))
    };

    let revenue = require(record.revenue, "revenue")?;
    let opex = require(record.opex, "opex")?;
    let headcount = require(record.headcount, "headcount")?;
    let inflation_idx = require(record.inflation_idx, "inflation_idx")?;
    let growth_idx = require(record.growth_idx, "growth_idx")?;
    let margin = require(record.margin, "margin")?;

    Ok(FeatureRow {
        month,
        revenue,
        opex,
        headcount,
        inflation_idx,
        growth_idx,
        margin,
        margin_pct: if revenue == 0.0 {
            None
        } else {
            Some(margin / revenue)
        },
    })
}
