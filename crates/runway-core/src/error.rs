//! Error types for Runway

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Not enough periods to run a computation. More history cannot be
    /// conjured, so callers should not retry.
    #[error("Insufficient history for {context}: need at least {required}, found {found}")]
    InsufficientHistory {
        context: &'static str,
        required: usize,
        found: usize,
    },

    #[error("Missing feature: {0}")]
    MissingFeature(String),

    #[error("Degenerate division: {0}")]
    DivisionDegenerate(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Narrative error: {0}")]
    Narrative(String),
}

pub type Result<T> = std::result::Result<T, Error>;
