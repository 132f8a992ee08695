//! Simulation time management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Number of internal units in one tick.
pub const UNITS_PER_TICK: u64 = 1_000_000;

/// Simulation time measured in ticks.
///
/// A tick is the abstract unit of simulated time every stage, sampler and
/// scheduled change is expressed in. `SimTime` stores micro-ticks so that
/// fractional latency draws keep their precision while ordering stays exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// Create a new SimTime at the simulation start (time zero)
    pub const fn zero() -> Self {
        SimTime(0)
    }

    /// Create a SimTime from raw micro-tick units
    pub const fn from_units(units: u64) -> Self {
        SimTime(units)
    }

    /// Create a SimTime from whole ticks
    pub const fn from_ticks(ticks: u64) -> Self {
        SimTime(ticks * UNITS_PER_TICK)
    }

    /// Create a SimTime from a fractional tick count.
    ///
    /// Negative and NaN inputs clamp to zero, values past the representable
    /// range saturate.
    pub fn from_ticks_f64(ticks: f64) -> Self {
        if !(ticks > 0.0) {
            return SimTime::zero();
        }
        let units = ticks * UNITS_PER_TICK as f64;
        if units >= u64::MAX as f64 {
            SimTime(u64::MAX)
        } else {
            SimTime(units.round() as u64)
        }
    }

    /// Get the raw micro-tick value
    pub const fn as_units(&self) -> u64 {
        self.0
    }

    /// Time as fractional ticks
    pub fn as_ticks_f64(&self) -> f64 {
        self.0 as f64 / UNITS_PER_TICK as f64
    }

    /// Whole ticks elapsed, rounded down
    pub const fn as_ticks(&self) -> u64 {
        self.0 / UNITS_PER_TICK
    }

    /// Ticks elapsed since an earlier time, saturating at zero
    pub fn ticks_since(&self, earlier: SimTime) -> f64 {
        SimTime(self.0.saturating_sub(earlier.0)).as_ticks_f64()
    }
}

impl Add<SimTime> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> Self::Output {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

impl Sub<SimTime> for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> Self::Output {
        SimTime(self.0.saturating_sub(rhs.0))
    }
}

impl Mul<u64> for SimTime {
    type Output = SimTime;

    fn mul(self, rhs: u64) -> Self::Output {
        SimTime(self.0.saturating_mul(rhs))
    }
}

impl Default for SimTime {
    fn default() -> Self {
        SimTime::zero()
    }
}

impl From<f64> for SimTime {
    /// Convert from fractional ticks
    ///
    /// # Examples
    /// ```
    /// # use des_core::SimTime;
    /// let time = SimTime::from(1.5);
    /// assert_eq!(time.as_units(), 1_500_000);
    /// ```
    fn from(ticks: f64) -> Self {
        SimTime::from_ticks_f64(ticks)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNITS_PER_TICK;
        let frac = self.0 % UNITS_PER_TICK;
        if frac == 0 {
            write!(f, "{whole}t")
        } else {
            write!(f, "{whole}.{frac:06}t")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simtime_creation() {
        assert_eq!(SimTime::zero().as_units(), 0);
        assert_eq!(SimTime::from_units(1000).as_units(), 1000);
        assert_eq!(SimTime::from_ticks(1).as_units(), UNITS_PER_TICK);
        assert_eq!(SimTime::from_ticks(24_000).as_ticks(), 24_000);
    }

    #[test]
    fn test_simtime_arithmetic() {
        let t1 = SimTime::from_ticks(100);
        let t2 = SimTime::from_ticks(50);

        assert_eq!(t1 + t2, SimTime::from_ticks(150));
        assert_eq!(t1 - t2, SimTime::from_ticks(50));
        assert_eq!(t2 - t1, SimTime::zero());
        assert_eq!(t2 * 3, SimTime::from_ticks(150));
        assert_eq!(t1.ticks_since(t2), 50.0);
    }

    #[test]
    fn test_simtime_ordering() {
        let t1 = SimTime::from_ticks(100);
        let t2 = SimTime::from_ticks(200);

        assert!(t1 < t2);
        assert!(t2 > t1);
        assert_eq!(t1, t1);
    }

    #[test]
    fn test_simtime_from_fractional_ticks() {
        assert_eq!(SimTime::from(1.0).as_units(), 1_000_000);
        assert_eq!(SimTime::from(0.5).as_units(), 500_000);
        assert_eq!(SimTime::from(0.000001).as_units(), 1);
        assert!((SimTime::from(31.25).as_ticks_f64() - 31.25).abs() < 1e-9);
    }

    #[test]
    fn test_simtime_clamps_invalid_input() {
        assert_eq!(SimTime::from(-3.0), SimTime::zero());
        assert_eq!(SimTime::from(f64::NAN), SimTime::zero());
        assert_eq!(SimTime::from(f64::INFINITY).as_units(), u64::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(SimTime::from_ticks(12).to_string(), "12t");
        assert_eq!(SimTime::from(1.5).to_string(), "1.500000t");
    }
}
