//! Export of reduced rows
//!
//! CSV is the primary per-trial artifact; JSON carries the same rows for
//! programmatic consumers.

pub mod csv;
pub mod json;

use crate::error::MetricsError;
use crate::reducer::SlimRow;
use std::path::Path;

/// Trait for exporting rows to different formats
pub trait MetricsExporter {
    /// Export rows to the configured destination
    fn export(&self, rows: &[SlimRow]) -> Result<(), MetricsError>;
}

/// Export rows to CSV format
///
/// # Example
/// ```no_run
/// use des_metrics::export::export_csv;
/// use des_metrics::{reduce, StatsRecorder};
///
/// let recorder = StatsRecorder::new();
/// // ... run a trial ...
/// export_csv(&reduce(&recorder), "results/A-0-SteadyLatency.csv").unwrap();
/// ```
pub fn export_csv(rows: &[SlimRow], path: impl AsRef<Path>) -> Result<(), MetricsError> {
    csv::CsvExporter::new(path.as_ref()).export(rows)
}

/// Export rows to JSON format
pub fn export_json(
    rows: &[SlimRow],
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), MetricsError> {
    json::JsonExporter::new(path.as_ref(), pretty).export(rows)
}
