//! Structured logging for pipeline simulations
//!
//! # How to Control Terminal Logging Output
//!
//! ## 1. Use `init_simulation_logging_with_level()` for specific levels
//! ```rust
//! use des_core::init_simulation_logging_with_level;
//! init_simulation_logging_with_level("debug");  // DEBUG and above
//! ```
//!
//! ## 2. Use Environment Variables (Most flexible)
//! ```bash
//! RUST_LOG=debug sensitivity --model A --scenario latency2 --params 400,50,0.99,80
//! RUST_LOG=des_components::resource=trace sensitivity ...
//! ```
//!
//! ## 3. Log Level Guidelines:
//! - **TRACE**: Per-request processing and individual random draws
//! - **DEBUG**: Component wiring and configuration changes
//! - **INFO**: Trial lifecycle
//! - **WARN**: Aborted or unexpectedly short runs
//!
//! Initialization is idempotent: a second call keeps the first subscriber.

use crate::SimTime;
use tracing::{info, Span};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for the simulation at `info` level.
pub fn init_simulation_logging() {
    init_simulation_logging_with_level("info")
}

/// Initialize logging with a specific level
///
/// # Arguments
/// * `level` - Log level: "trace", "debug", "info", "warn", or "error"
///
/// `RUST_LOG`, when set, takes precedence over `level`.
pub fn init_simulation_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{level},des_core::randomness=info,des_core::scheduler={level},des_components={level}"
        )
        .into()
    });

    let initialized = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if initialized {
        info!("Simulation logging initialized at level: {}", level);
    }
}

/// Create a span covering one experiment trial.
pub fn trial_span(model: &str, trial: u32, scenario: &str) -> Span {
    tracing::info_span!("trial", model = model, trial = trial, scenario = scenario)
}

/// Create a span for tracking component execution
pub fn component_span(component_name: &str, time: SimTime) -> Span {
    tracing::debug_span!("component", name = component_name, time = %time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, trace};

    #[test]
    fn test_logging_initialization_is_idempotent() {
        init_simulation_logging_with_level("debug");
        init_simulation_logging();

        info!("Test info message");
        debug!("Test debug message");
        trace!("Test trace message");
    }

    #[test]
    fn test_span_creation() {
        let trial = trial_span("A", 0, "SteadyLatency");
        let _guard = trial.enter();
        let _component = component_span("resource", SimTime::from_ticks(3));
    }
}
