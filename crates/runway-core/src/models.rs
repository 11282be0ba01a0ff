//! Data models for Runway
//!
//! Raw tables come from an external data source and are never mutated here.
//! Feature rows, variance summaries and forecasts are derived records.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// A calendar month, stored as the first day of that month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

impl Month {
    /// Create a month from a year and a 1-based month number
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Month)
            .ok_or_else(|| Error::InvalidData(format!("Invalid month: {}-{}", year, month)))
    }

    /// Truncate any date to its month
    pub fn from_date(date: NaiveDate) -> Self {
        // Day 1 always exists for a valid date's year/month
        Month(date.with_day(1).unwrap_or(date))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    /// The calendar month immediately following this one
    ///
    /// None at the last month chrono can represent.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add_months(Months::new(1)).map(Month)
    }

    /// Inclusive range of months from `start` to `end`
    pub fn range(start: Month, end: Month) -> Vec<Month> {
        let mut months = Vec::new();
        let mut current = Some(start);
        while let Some(month) = current.filter(|m| *m <= end) {
            months.push(month);
            current = month.next();
        }
        months
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for Month {
    type Err = Error;

    /// Accepts `YYYY-MM-DD`, `YYYY-MM` and timestamp strings such as
    /// `YYYY-MM-DD 00:00:00`. Any day is truncated to the month.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let date_part = s.get(..10).unwrap_or(s);

        if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            return Ok(Month::from_date(date));
        }
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
            return Ok(Month::from_date(date));
        }

        Err(Error::InvalidData(format!("Unparseable month: {:?}", s)))
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Revenue for one (month, product, region)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRecord {
    pub month: Month,
    pub product: String,
    pub region: String,
    pub revenue: f64,
}

/// Operating expense for one (month, category)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpexRecord {
    pub month: Month,
    pub category: String,
    pub opex: f64,
}

/// Headcount for one (month, department)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadcountRecord {
    pub month: Month,
    pub department: String,
    pub headcount: u32,
    pub avg_monthly_cost: f64,
}

/// Macroeconomic indices for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRecord {
    pub month: Month,
    pub inflation_idx: f64,
    pub growth_idx: f64,
}

/// The four raw tables produced by the data source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTables {
    pub revenue: Vec<RevenueRecord>,
    pub opex: Vec<OpexRecord>,
    pub headcount: Vec<HeadcountRecord>,
    pub macro_drivers: Vec<MacroRecord>,
}

/// One month of the aggregated feature table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub month: Month,
    pub revenue: f64,
    pub opex: f64,
    pub headcount: f64,
    pub inflation_idx: f64,
    pub growth_idx: f64,
    pub margin: f64,
    /// `None` when revenue is zero; written as `undefined`
    #[serde(with = "margin_pct_marker")]
    pub margin_pct: Option<f64>,
}

impl FeatureRow {
    /// Build a row from totals, deriving margin and margin percentage
    pub fn new(
        month: Month,
        revenue: f64,
        opex: f64,
        headcount: f64,
        inflation_idx: f64,
        growth_idx: f64,
    ) -> Self {
        let margin = revenue - opex;
        let margin_pct = if revenue == 0.0 {
            None
        } else {
            Some(margin / revenue)
        };
        Self {
            month,
            revenue,
            opex,
            headcount,
            inflation_idx,
            growth_idx,
            margin,
            margin_pct,
        }
    }

    /// Margin as a fraction of revenue, failing when revenue is zero
    pub fn margin_ratio(&self) -> Result<f64> {
        self.margin_pct.ok_or_else(|| {
            Error::DivisionDegenerate(format!(
                "margin_pct undefined for {}: revenue is zero",
                self.month
            ))
        })
    }
}

/// Serde adapter writing an undefined margin percentage as `undefined`
mod margin_pct_marker {
    use serde::{Deserialize, Deserializer, Serializer};

    pub const UNDEFINED: &str = "undefined";

    pub fn serialize<S: Serializer>(
        value: &Option<f64>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_f64(*v),
            None => serializer.serialize_str(UNDEFINED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<f64>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case(UNDEFINED) {
            return Ok(None);
        }
        let value: f64 = raw.parse().map_err(serde::de::Error::custom)?;
        Ok(value.is_finite().then_some(value))
    }
}

/// Month-over-month variance between the two most recent months
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceSummary {
    pub revenue_change: f64,
    pub opex_change: f64,
    pub margin_change: f64,
    /// Region with the largest signed revenue delta
    pub top_region_driver: String,
    pub top_region_delta: f64,
}

/// One-step-ahead forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub month: Month,
    pub revenue_forecast: f64,
    pub opex_forecast: f64,
    pub margin_forecast: f64,
    pub assumed_headcount: f64,
    pub assumed_inflation_idx: f64,
    pub assumed_growth_idx: f64,
}

/// Out-of-sample accuracy on the holdout window, as percentages
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub revenue_mape: f64,
    pub opex_mape: f64,
    pub margin_mape: f64,
}

/// Executive commentary produced from a variance summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveNarrative {
    pub executive_narrative: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_parse_formats() {
        let expected = Month::new(2024, 3).unwrap();
        assert_eq!("2024-03-01".parse::<Month>().unwrap(), expected);
        assert_eq!("2024-03".parse::<Month>().unwrap(), expected);
        assert_eq!("2024-03-17".parse::<Month>().unwrap(), expected);
        assert_eq!("2024-03-01 00:00:00".parse::<Month>().unwrap(), expected);
        assert!("March 2024".parse::<Month>().is_err());
    }

    #[test]
    fn test_month_next_rolls_year() {
        let dec = Month::new(2025, 12).unwrap();
        assert_eq!(dec.next(), Some(Month::new(2026, 1).unwrap()));
        assert_eq!(
            Month::new(2025, 1).unwrap().next(),
            Some(Month::new(2025, 2).unwrap())
        );
    }

    #[test]
    fn test_month_range_stops_at_calendar_limit() {
        let last = Month::from_date(NaiveDate::MAX);
        assert_eq!(last.next(), None);

        let months = Month::range(last, last);
        assert_eq!(months, vec![last]);
    }

    #[test]
    fn test_month_display() {
        assert_eq!(Month::new(2022, 7).unwrap().to_string(), "2022-07-01");
    }

    #[test]
    fn test_month_range_inclusive() {
        let months = Month::range(
            Month::new(2024, 11).unwrap(),
            Month::new(2025, 2).unwrap(),
        );
        assert_eq!(months.len(), 4);
        assert_eq!(months[3], Month::new(2025, 2).unwrap());
    }

    #[test]
    fn test_feature_row_margin() {
        let row = FeatureRow::new(Month::new(2024, 1).unwrap(), 1000.0, 600.0, 10.0, 100.0, 100.0);
        assert_eq!(row.margin, 400.0);
        assert_eq!(row.margin_pct, Some(0.4));
        assert_eq!(row.margin_ratio().unwrap(), 0.4);
    }

    #[test]
    fn test_feature_row_zero_revenue_is_flagged() {
        let row = FeatureRow::new(Month::new(2024, 1).unwrap(), 0.0, 50.0, 10.0, 100.0, 100.0);
        assert_eq!(row.margin, -50.0);
        assert!(row.margin_pct.is_none());
        assert!(matches!(
            row.margin_ratio(),
            Err(Error::DivisionDegenerate(_))
        ));
    }
}
