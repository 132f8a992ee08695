//! Metrics collection and reduction for pipeline simulations
//!
//! Stages write per-sample values into a [`SharedRecorder`]; after a trial the
//! recording is reduced into [`SlimRow`]s and exported.

pub mod error;
pub mod export;
pub mod recorder;
pub mod reducer;
pub mod stats;

pub use error::MetricsError;
pub use export::{export_csv, export_json, MetricsExporter};
pub use recorder::{SharedRecorder, StatsRecorder};
pub use reducer::{reduce, SlimRow};
pub use stats::{mean, MeanAccumulator};
