//! Error types for the experiment harness

use des_metrics::MetricsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("No model available for {0:?}")]
    UnknownModel(String),

    #[error("No injector available for {0:?}")]
    UnknownInjector(String),

    #[error("Injector {injector} needs parameter #{index}, got {given} parameters")]
    MissingParameter {
        injector: &'static str,
        index: usize,
        given: usize,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to export rows: {0}")]
    Metrics(#[from] MetricsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}
