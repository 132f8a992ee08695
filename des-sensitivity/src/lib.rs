//! Sensitivity-analysis harness for resiliency pipelines
//!
//! Picks a model ([`ModelKind`]) and a parameter injector ([`InjectorKind`]),
//! turns a numeric parameter vector into a scenario, and runs reproducible
//! trials through [`ExperimentRunner`]. Each trial writes one CSV file of
//! per-sample rows.
//!
//! ```no_run
//! use des_sensitivity::{ExperimentRunner, InjectorKind, ModelKind, RunnerConfig};
//!
//! let runner = ExperimentRunner::new(RunnerConfig::default());
//! let outcome = runner
//!     .run_trial(ModelKind::Naive, InjectorKind::Latency2, &[400.0, 50.0, 0.99, 80.0], 0)
//!     .unwrap();
//! println!("wrote {}", outcome.csv_path.display());
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod injectors;
pub mod models;
pub mod runner;
pub mod scenario;

pub use config::RunnerConfig;
pub use context::TrialContext;
pub use error::ExperimentError;
pub use injectors::InjectorKind;
pub use models::{Model, ModelKind};
pub use runner::{trial_name, ExperimentRunner, TrialOutcome, TrialRun};
pub use scenario::{Pipeline, ScenarioPlan};
