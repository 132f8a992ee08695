//! JSON export for reduced rows
//!
//! Rows are written as an array of objects keyed by the same column names the
//! CSV header uses; undefined cells become `null`.

use crate::error::MetricsError;
use crate::export::MetricsExporter;
use crate::reducer::SlimRow;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON exporter for one trial's rows
#[derive(Debug)]
pub struct JsonExporter {
    path: PathBuf,
    pretty: bool,
}

impl JsonExporter {
    /// Create a new JSON exporter
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `pretty` - Whether to pretty-print the JSON (adds whitespace for readability)
    pub fn new(path: &Path, pretty: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            pretty,
        }
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, rows: &[SlimRow]) -> Result<(), MetricsError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(rows)
        } else {
            serde_json::to_string(rows)
        }
        .map_err(|e| MetricsError::ExportError(format!("JSON serialization failed: {e}")))?;

        let mut file = File::create(&self.path)
            .map_err(|e| MetricsError::ExportError(format!("Failed to create file: {e}")))?;

        file.write_all(json.as_bytes())
            .map_err(|e| MetricsError::ExportError(format!("Failed to write to file: {e}")))?;

        Ok(())
    }
}
