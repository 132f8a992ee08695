//! Arrival patterns and key generation for request sources.
//!
//! Every sampler here takes the random source as an argument instead of owning
//! a generator, so that a whole trial draws from one seeded stream.

use crate::draw_site;
use crate::randomness::RandomProvider;
use crate::time::SimTime;

/// Trait for generating arrival patterns
///
/// This trait abstracts over different arrival patterns for request generation
/// (Poisson, constant, ...).
pub trait ArrivalPattern: Send {
    /// Get the time until the next request arrival, or `None` if the pattern
    /// will never produce another arrival (for example a zero rate).
    fn next_arrival_time(&mut self, rng: &mut dyn RandomProvider) -> Option<SimTime>;

    /// Change the arrival rate, in events per 1000 ticks.
    fn set_rate(&mut self, events_per_1000_ticks: f64);
}

/// Simple constant arrival pattern
///
/// Generates requests with a fixed inter-arrival time.
#[derive(Debug, Clone)]
pub struct ConstantArrivalPattern {
    inter_arrival_time: SimTime,
}

impl ConstantArrivalPattern {
    /// Create a new constant arrival pattern
    pub fn new(inter_arrival_time: SimTime) -> Self {
        Self { inter_arrival_time }
    }
}

impl ArrivalPattern for ConstantArrivalPattern {
    fn next_arrival_time(&mut self, _rng: &mut dyn RandomProvider) -> Option<SimTime> {
        Some(self.inter_arrival_time)
    }

    fn set_rate(&mut self, events_per_1000_ticks: f64) {
        self.inter_arrival_time = if events_per_1000_ticks > 0.0 {
            SimTime::from_ticks_f64(1000.0 / events_per_1000_ticks)
        } else {
            SimTime::from_units(u64::MAX)
        };
    }
}

/// Poisson arrival pattern
///
/// Generates requests according to a Poisson process with exponentially
/// distributed inter-arrival times. The rate is expressed in events per 1000
/// ticks and may be changed while a run is in progress.
#[derive(Debug, Clone)]
pub struct PoissonArrivals {
    events_per_1000_ticks: f64,
}

impl PoissonArrivals {
    pub fn new(events_per_1000_ticks: f64) -> Self {
        Self {
            events_per_1000_ticks,
        }
    }

    /// Get the rate parameter
    pub fn rate(&self) -> f64 {
        self.events_per_1000_ticks
    }
}

impl ArrivalPattern for PoissonArrivals {
    fn next_arrival_time(&mut self, rng: &mut dyn RandomProvider) -> Option<SimTime> {
        let per_tick = self.events_per_1000_ticks / 1000.0;
        let gap = rng.exponential(draw_site!("inter_arrival"), per_tick);
        gap.is_finite().then(|| SimTime::from_ticks_f64(gap))
    }

    fn set_rate(&mut self, events_per_1000_ticks: f64) {
        self.events_per_1000_ticks = events_per_1000_ticks;
    }
}

/// Draws request keys of the form `k-<n>` with `n` normally distributed over
/// the keyspace and clamped at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyGenerator {
    pub mean: f64,
    pub std_dev: f64,
}

impl KeyGenerator {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    pub fn next_key(&self, rng: &mut dyn RandomProvider) -> String {
        let position = rng
            .normal(draw_site!("keyspace"), self.mean, self.std_dev)
            .round()
            .max(0.0);
        format!("k-{}", position as u64)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new(10_000.0, 500.0)
    }
}
