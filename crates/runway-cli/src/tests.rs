//! CLI command tests
//!
//! Each test gets its own temporary data directory.

use std::path::Path;

use runway_core::test_utils::MockTextServer;
use runway_core::{AIClient, CsvStore, MockBackend, Month, RunwayConfig, SyntheticConfig};

use crate::commands::{self, fmt_money};

fn setup_store() -> (tempfile::TempDir, CsvStore, RunwayConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = RunwayConfig::default();
    let store = commands::open_store(&config, Some(dir.path()));
    (dir, store, config)
}

fn generate_and_build(store: &CsvStore, config: &RunwayConfig) {
    commands::cmd_generate(store, &config.synthetic, false).unwrap();
    commands::cmd_features(store, false).unwrap();
}

// ========== Store Tests ==========

#[test]
fn test_open_store_data_dir_override() {
    let config = RunwayConfig::default();
    let store = commands::open_store(&config, Some(Path::new("/tmp/runway-data")));
    assert_eq!(store.raw_dir(), Path::new("/tmp/runway-data/raw"));
    assert_eq!(store.processed_dir(), Path::new("/tmp/runway-data/processed"));
}

#[test]
fn test_open_store_uses_config_paths() {
    let config = RunwayConfig::default();
    let store = commands::open_store(&config, None);
    assert_eq!(store.raw_dir(), config.data.raw_dir.as_path());
    assert_eq!(store.processed_dir(), config.data.processed_dir.as_path());
}

// ========== Data Command Tests ==========

#[test]
fn test_cmd_generate_writes_raw_tables() {
    let (_dir, store, config) = setup_store();
    commands::cmd_generate(&store, &config.synthetic, false).unwrap();

    for file in [
        "revenue_monthly.csv",
        "opex_monthly.csv",
        "headcount.csv",
        "macro_drivers.csv",
    ] {
        assert!(store.raw_path(file).exists(), "{} not written", file);
    }
}

#[test]
fn test_cmd_features_requires_raw_tables() {
    let (_dir, store, _config) = setup_store();
    assert!(commands::cmd_features(&store, false).is_err());
}

#[test]
fn test_cmd_generate_and_features_json() {
    let (_dir, store, config) = setup_store();
    commands::cmd_generate(&store, &config.synthetic, true).unwrap();
    commands::cmd_features(&store, true).unwrap();
    assert_eq!(store.read_feature_table().unwrap().len(), 48);
}

#[test]
fn test_cmd_features_writes_feature_table() {
    let (_dir, store, config) = setup_store();
    generate_and_build(&store, &config);

    let rows = store.read_feature_table().unwrap();
    assert_eq!(rows.len(), 48);
}

// ========== Variance Command Tests ==========

#[test]
fn test_cmd_variance_latest_months() {
    let (_dir, store, config) = setup_store();
    commands::cmd_generate(&store, &config.synthetic, false).unwrap();

    let summary = commands::cmd_variance(&store, false).unwrap();
    assert_eq!(store.read_variance_summary().unwrap(), summary);
    assert!(
        (summary.margin_change - (summary.revenue_change - summary.opex_change)).abs() < 1e-6
    );
}

#[test]
fn test_cmd_variance_json_output() {
    let (_dir, store, config) = setup_store();
    commands::cmd_generate(&store, &config.synthetic, false).unwrap();
    assert!(commands::cmd_variance(&store, true).is_ok());
}

#[test]
fn test_cmd_variance_without_data_fails() {
    let (_dir, store, _config) = setup_store();
    assert!(commands::cmd_variance(&store, false).is_err());
}

// ========== Forecast Command Tests ==========

#[test]
fn test_cmd_forecast_default_holdout() {
    let (_dir, store, config) = setup_store();
    generate_and_build(&store, &config);

    let run = commands::cmd_forecast(&store, &config.forecast, false).unwrap();
    assert_eq!(run.test_months, 6);
    assert_eq!(run.forecast.month, Month::new(2026, 1).unwrap());
    assert_eq!(store.read_forecast().unwrap(), run.forecast);
}

#[test]
fn test_cmd_forecast_custom_holdout_and_json() {
    let (_dir, store, mut config) = setup_store();
    generate_and_build(&store, &config);

    config.forecast.holdout_months = 12;
    let run = commands::cmd_forecast(&store, &config.forecast, true).unwrap();
    assert_eq!(run.train_months, 36);
    assert_eq!(run.test_months, 12);
}

#[test]
fn test_cmd_forecast_short_history_fails() {
    let (_dir, store, mut config) = setup_store();
    config.synthetic = SyntheticConfig {
        start: Month::new(2025, 7).unwrap(),
        end: Month::new(2025, 12).unwrap(),
        ..config.synthetic
    };
    generate_and_build(&store, &config);

    let err = commands::cmd_forecast(&store, &config.forecast, false).unwrap_err();
    let root = err.root_cause().to_string();
    assert!(root.contains("Insufficient history"), "unexpected error: {}", root);
}

// ========== Narrative Command Tests ==========

#[tokio::test]
async fn test_cmd_narrate_with_mock_backend() {
    let (_dir, store, config) = setup_store();
    commands::cmd_generate(&store, &config.synthetic, false).unwrap();
    commands::cmd_variance(&store, false).unwrap();

    let narrative = commands::cmd_narrate(&store, &config.narrative, AIClient::mock(), false)
        .await
        .unwrap();
    assert!(!narrative.executive_narrative.is_empty());
    assert_eq!(store.read_narrative().unwrap(), narrative);
}

#[tokio::test]
async fn test_cmd_narrate_against_mock_server() {
    let server = MockTextServer::start().await;
    let (_dir, store, config) = setup_store();
    commands::cmd_generate(&store, &config.synthetic, false).unwrap();
    let summary = commands::cmd_variance(&store, false).unwrap();

    let client = AIClient::openai_compatible(&server.url(), "gpt-4.1-mini");
    let narrative = commands::cmd_narrate(&store, &config.narrative, client, false)
        .await
        .unwrap();
    assert!(narrative
        .executive_narrative
        .contains(&summary.top_region_driver));
}

#[tokio::test]
async fn test_cmd_narrate_requires_variance_summary() {
    let (_dir, store, config) = setup_store();
    let result = commands::cmd_narrate(&store, &config.narrative, AIClient::mock(), false).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_narrate_backend_failure_writes_nothing() {
    let server = MockTextServer::start_failing().await;
    let (_dir, store, config) = setup_store();
    commands::cmd_generate(&store, &config.synthetic, false).unwrap();
    commands::cmd_variance(&store, false).unwrap();

    let client = AIClient::ollama(&server.url(), "llama3.2");
    let result = commands::cmd_narrate(&store, &config.narrative, client, false).await;
    assert!(result.is_err());
    assert!(!store.processed_path("cfo_narrative.csv").exists());
}

#[tokio::test]
async fn test_ensure_backend_rejects_unhealthy() {
    assert!(commands::ensure_backend(&AIClient::mock()).await.is_ok());

    let err = commands::ensure_backend(&AIClient::Mock(MockBackend::unhealthy()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("mock://localhost"));
}

// ========== Run Command Tests ==========

#[tokio::test]
async fn test_cmd_run_full_pipeline() {
    let (_dir, store, config) = setup_store();
    commands::cmd_run(&store, &config, true, Some(AIClient::mock()), false)
        .await
        .unwrap();

    for file in [
        "training_table.csv",
        "variance_summary.csv",
        "next_month_forecast.csv",
        "cfo_narrative.csv",
    ] {
        assert!(store.processed_path(file).exists(), "{} not written", file);
    }
}

#[tokio::test]
async fn test_cmd_run_without_narrative() {
    let (_dir, store, config) = setup_store();
    commands::cmd_run(&store, &config, true, None, false)
        .await
        .unwrap();

    assert!(store.processed_path("next_month_forecast.csv").exists());
    assert!(!store.processed_path("cfo_narrative.csv").exists());
}

#[tokio::test]
async fn test_cmd_run_without_raw_data_fails() {
    let (_dir, store, config) = setup_store();
    let result = commands::cmd_run(&store, &config, false, Some(AIClient::mock()), false).await;
    assert!(result.is_err());
    assert!(!store.processed_path("cfo_narrative.csv").exists());
}

#[tokio::test]
async fn test_cmd_run_unhealthy_backend_writes_nothing() {
    let (_dir, store, config) = setup_store();
    let client = AIClient::Mock(MockBackend::unhealthy());
    let result = commands::cmd_run(&store, &config, true, Some(client), false).await;

    assert!(result.is_err());
    assert!(!store.raw_path("revenue_monthly.csv").exists());
    assert!(!store.processed_path("training_table.csv").exists());
}

#[tokio::test]
async fn test_cmd_run_json_output() {
    let (_dir, store, config) = setup_store();
    commands::cmd_run(&store, &config, true, Some(AIClient::mock()), true)
        .await
        .unwrap();
    assert!(store.processed_path("cfo_narrative.csv").exists());
}

// ========== Formatting Tests ==========

#[test]
fn test_fmt_money() {
    assert_eq!(fmt_money(0.0), "$0.00");
    assert_eq!(fmt_money(999.5), "$999.50");
    assert_eq!(fmt_money(1234.567), "$1,234.57");
    assert_eq!(fmt_money(-1_234_567.0), "-$1,234,567.00");
    assert_eq!(fmt_money(100.0), "$100.00");
    assert_eq!(fmt_money(-0.001), "$0.00");
}
