//! CSV export for reduced rows
//!
//! Writes a header row with the [`SlimRow::HEADER`] column names followed by one
//! line per row. Undefined cells are written as empty fields.

use crate::error::MetricsError;
use crate::export::MetricsExporter;
use crate::reducer::SlimRow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// CSV exporter for one trial's rows
#[derive(Debug)]
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    /// Create a new CSV exporter writing to `path`
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write rows to any sink.
    pub fn write_rows<W: Write>(writer: &mut W, rows: &[SlimRow]) -> Result<(), MetricsError> {
        writeln!(writer, "{}", SlimRow::HEADER.join(","))
            .map_err(|e| MetricsError::ExportError(format!("Failed to write header: {e}")))?;

        for row in rows {
            let line = row
                .values()
                .iter()
                .map(|cell| format_cell(*cell))
                .collect::<Vec<_>>()
                .join(",");
            writeln!(writer, "{line}")
                .map_err(|e| MetricsError::ExportError(format!("Failed to write row: {e}")))?;
        }
        Ok(())
    }
}

impl MetricsExporter for CsvExporter {
    fn export(&self, rows: &[SlimRow]) -> Result<(), MetricsError> {
        let file = File::create(&self.path)
            .map_err(|e| MetricsError::ExportError(format!("Failed to create file: {e}")))?;
        let mut writer = BufWriter::new(file);
        Self::write_rows(&mut writer, rows)?;
        writer
            .flush()
            .map_err(|e| MetricsError::ExportError(format!("Failed to flush file: {e}")))?;
        Ok(())
    }
}

/// Empty for undefined cells, shortest round-trip form otherwise.
fn format_cell(cell: Option<f64>) -> String {
    match cell {
        Some(value) if value.is_finite() => value.to_string(),
        _ => String::new(),
    }
}
