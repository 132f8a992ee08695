//! Error types for the simulation framework

use crate::SimTime;
use thiserror::Error;

/// Top-level error type for simulation operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A component aborted the whole run.
    #[error("Simulation aborted at {time}: {reason}")]
    Aborted { time: SimTime, reason: String },
}
