//! Runner configuration.
//!
//! Every field has a default, so a JSON file only needs the fields it
//! changes:
//!
//! ```json
//! { "seed": 7, "output_dir": "results" }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use des_core::ids::derive_seed;
use des_core::SimTime;

use crate::error::ExperimentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Base seed; each trial derives its own seed from it.
    pub seed: u64,
    /// Uniform draws thrown away after reseeding.
    pub warmup_discards: usize,
    /// Requests issued per trial.
    pub arrivals: u64,
    /// A trial whose clock ends below this tick count is reported as short.
    pub expected_min_ticks: f64,
    /// Global time-dilation factor applied to rates, latencies and deadlines.
    pub tick_dilation: f64,
    /// Ticks between samples.
    pub sample_interval: f64,
    /// Simulated time at which an undrained trial is aborted.
    pub max_sim_ticks: f64,
    pub output_dir: PathBuf,
    /// Also write rows as JSON next to the CSV file.
    pub export_json: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            warmup_discards: 2,
            arrivals: 20_000,
            expected_min_ticks: 145_000.0,
            tick_dilation: 3.0,
            sample_interval: 1000.0,
            max_sim_ticks: 2_000_000.0,
            output_dir: PathBuf::from("out"),
            export_json: true,
        }
    }
}

impl RunnerConfig {
    /// Load a configuration from a JSON file. Missing fields keep their
    /// defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ExperimentError> {
        let text = fs::read_to_string(path)?;
        let config: RunnerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        if !(self.tick_dilation > 0.0) {
            return Err(ExperimentError::Config(format!(
                "tick_dilation must be positive, got {}",
                self.tick_dilation
            )));
        }
        if !(self.sample_interval > 0.0) {
            return Err(ExperimentError::Config(format!(
                "sample_interval must be positive, got {}",
                self.sample_interval
            )));
        }
        Ok(())
    }

    /// Seed used by trial `trial`.
    pub fn trial_seed(&self, trial: u32) -> u64 {
        derive_seed(self.seed, u64::from(trial))
    }

    pub fn sample_interval(&self) -> SimTime {
        SimTime::from_ticks_f64(self.sample_interval)
    }

    pub fn watchdog(&self) -> SimTime {
        SimTime::from_ticks_f64(self.max_sim_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_harness_constants() {
        let config = RunnerConfig::default();
        assert_eq!(config.warmup_discards, 2);
        assert_eq!(config.arrivals, 20_000);
        assert_eq!(config.expected_min_ticks, 145_000.0);
        assert_eq!(config.tick_dilation, 3.0);
        assert_eq!(config.sample_interval(), SimTime::from_ticks(1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "seed": 9, "output_dir": "results" }}"#).unwrap();

        let config = RunnerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.output_dir, PathBuf::from("results"));
        assert_eq!(config.arrivals, 20_000);
        assert_eq!(config.trial_seed(3), derive_seed(9, 3));
        assert_ne!(config.trial_seed(3), config.trial_seed(4));
    }

    #[test]
    fn rejects_non_positive_dilation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "tick_dilation": 0.0 }}"#).unwrap();

        let err = RunnerConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ExperimentError::Config(_)));
    }

    #[test]
    fn malformed_json_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            RunnerConfig::from_json_file(file.path()),
            Err(ExperimentError::Json(_))
        ));
    }
}
