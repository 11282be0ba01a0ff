//! Runway Core Library
//!
//! Monthly FP&A pipeline for the Runway tool:
//! - Typed raw tables and CSV storage
//! - Feature table aggregation
//! - Month-over-month variance decomposition by region
//! - Driver-based linear forecasting with holdout accuracy
//! - Executive narratives through pluggable text-generation backends
//! - Seeded synthetic company data

pub mod ai;
pub mod config;
pub mod error;
pub mod features;
pub mod forecast;
pub mod models;
pub mod narrative;
pub mod prompts;
pub mod storage;
pub mod synth;
pub mod variance;

/// Test utilities including a mock text-generation server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, CompletionRequest, MockBackend, OllamaBackend, OpenAICompatibleBackend,
};
pub use config::{DataConfig, NarrativeConfig, RunwayConfig, SyntheticConfig};
pub use error::{Error, Result};
pub use features::build_feature_table;
pub use forecast::{
    run_baseline_forecast, DriverAssumptions, DriverModels, ForecastConfig, ForecastRun,
    LinearModel,
};
pub use models::{
    AccuracyReport, ExecutiveNarrative, FeatureRow, ForecastResult, HeadcountRecord, MacroRecord,
    Month, OpexRecord, RawTables, RevenueRecord, VarianceSummary,
};
pub use narrative::NarrativeGenerator;
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use storage::CsvStore;
pub use synth::generate_synthetic_tables;
pub use variance::decompose_variance;
