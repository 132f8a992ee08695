//! Error types for metrics recording and export

use thiserror::Error;

/// Errors related to metrics collection and export
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Invalid metric: {0}")]
    InvalidMetric(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Export error: {0}")]
    ExportError(String),
}
