//! Pipeline configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the override in the config dir
//!    (~/.config/runway/runway.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Every key is optional in an override file; anything left out keeps its
//! default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::forecast::{DriverAssumptions, ForecastConfig};
use crate::models::Month;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/runway.toml");

/// Where raw and processed tables live
#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
        }
    }
}

/// Settings passed to the text-generation backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NarrativeConfig {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            max_tokens: 150,
            temperature: 0.3,
        }
    }
}

/// Synthetic data source settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub start: Month,
    pub end: Month,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start: Month::new(2022, 1).expect("literal month is valid"),
            end: Month::new(2025, 12).expect("literal month is valid"),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunwayConfig {
    pub data: DataConfig,
    pub forecast: ForecastConfig,
    pub narrative: NarrativeConfig,
    pub synthetic: SyntheticConfig,
    /// File the config was read from (None for embedded defaults)
    pub source: Option<PathBuf>,
}

impl RunwayConfig {
    /// Load config: explicit path, then default override path, then embedded
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        match path {
            Some(p) if p.exists() => {
                let content = fs::read_to_string(&p).map_err(|e| {
                    Error::Config(format!("Failed to read config {}: {}", p.display(), e))
                })?;
                debug!(path = %p.display(), "Loaded config override");
                let mut config = parse_config(&content)?;
                config.source = Some(p);
                Ok(config)
            }
            Some(p) => Err(Error::Config(format!(
                "Config file not found: {}",
                p.display()
            ))),
            None => Self::embedded(),
        }
    }

    /// Embedded defaults only
    pub fn embedded() -> Result<Self> {
        parse_config(DEFAULT_CONFIG)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("runway").join("runway.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    data: Option<RawData>,
    forecast: Option<RawForecast>,
    narrative: Option<RawNarrative>,
    synthetic: Option<RawSynthetic>,
}

#[derive(Debug, Deserialize)]
struct RawData {
    raw_dir: Option<PathBuf>,
    processed_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    holdout_months: Option<usize>,
    mape_epsilon: Option<f64>,
    assumptions: Option<RawAssumptions>,
}

#[derive(Debug, Deserialize)]
struct RawAssumptions {
    headcount: Option<f64>,
    inflation_idx: Option<f64>,
    growth_idx: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawNarrative {
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RawSynthetic {
    seed: Option<u64>,
    start: Option<String>,
    end: Option<String>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<RunwayConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = RunwayConfig::default();

    if let Some(data) = raw.data {
        if let Some(raw_dir) = data.raw_dir {
            config.data.raw_dir = raw_dir;
        }
        if let Some(processed_dir) = data.processed_dir {
            config.data.processed_dir = processed_dir;
        }
    }

    if let Some(forecast) = raw.forecast {
        if let Some(holdout) = forecast.holdout_months {
            if holdout == 0 {
                return Err(Error::Config(
                    "forecast.holdout_months must be at least 1".into(),
                ));
            }
            config.forecast.holdout_months = holdout;
        }
        if let Some(epsilon) = forecast.mape_epsilon {
            if !(epsilon > 0.0 && epsilon.is_finite()) {
                return Err(Error::Config(
                    "forecast.mape_epsilon must be a positive number".into(),
                ));
            }
            config.forecast.mape_epsilon = epsilon;
        }
        if let Some(assumptions) = forecast.assumptions {
            let defaults = DriverAssumptions::default();
            config.forecast.assumptions = DriverAssumptions {
                headcount: assumptions.headcount.unwrap_or(defaults.headcount),
                inflation_idx: assumptions.inflation_idx.unwrap_or(defaults.inflation_idx),
                growth_idx: assumptions.growth_idx.unwrap_or(defaults.growth_idx),
            };
        }
    }

    if let Some(narrative) = raw.narrative {
        if let Some(max_tokens) = narrative.max_tokens {
            config.narrative.max_tokens = max_tokens;
        }
        if let Some(temperature) = narrative.temperature {
            config.narrative.temperature = temperature;
        }
    }

    if let Some(synthetic) = raw.synthetic {
        if let Some(seed) = synthetic.seed {
            config.synthetic.seed = seed;
        }
        if let Some(start) = synthetic.start {
            config.synthetic.start = parse_month(&start, "synthetic.start")?;
        }
        if let Some(end) = synthetic.end {
            config.synthetic.end = parse_month(&end, "synthetic.end")?;
        }
        if config.synthetic.start > config.synthetic.end {
            return Err(Error::Config(
                "synthetic.start must not be after synthetic.end".into(),
            ));
        }
    }

    Ok(config)
}

fn parse_month(value: &str, key: &str) -> Result<Month> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{} is not a month: {:?}", key, value)))
}
