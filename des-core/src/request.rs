//! The request record that travels through a pipeline.
//!
//! A [`Request`] is created by the arrival source, enriched once by the entry
//! hook, passed by value between stages and finally stamped with its outcome
//! and end time by the entry stage before it is recorded.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SimTime;

/// Final or in-flight result of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[default]
    Pending,
    Success,
    Failure,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// 1.0 for success, 0.0 otherwise. Used for mean availability.
    pub fn as_availability(&self) -> f64 {
        if self.is_success() {
            1.0
        } else {
            0.0
        }
    }
}

/// Latency class assigned from the request key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineClass {
    Fast,
    Medium,
    Slow,
}

impl DeadlineClass {
    pub const ALL: [DeadlineClass; 3] = [DeadlineClass::Fast, DeadlineClass::Medium, DeadlineClass::Slow];

    /// Class for the `index`-th bucket, wrapping modulo 3.
    pub fn from_index(index: u64) -> Self {
        Self::ALL[(index % 3) as usize]
    }

    pub fn index(&self) -> usize {
        match self {
            DeadlineClass::Fast => 0,
            DeadlineClass::Medium => 1,
            DeadlineClass::Slow => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineClass::Fast => "fast",
            DeadlineClass::Medium => "medium",
            DeadlineClass::Slow => "slow",
        }
    }
}

impl fmt::Display for DeadlineClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scenario-specific properties attached to a request.
///
/// Every field starts out empty; hooks fill in the ones their scenario uses.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Priority class 0..=2.
    pub priority: Option<u8>,
    /// Deadline in ticks.
    pub deadline: Option<f64>,
    pub deadline_class: Option<DeadlineClass>,
    /// Total time a per-request timeout stage allows, in ticks.
    pub timeout_budget: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseTime {
    pub start_time: SimTime,
    pub end_time: SimTime,
}

impl ResponseTime {
    /// Latency in ticks, `end - start`.
    pub fn latency(&self) -> f64 {
        self.end_time.ticks_since(self.start_time)
    }
}

/// One simulated request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub key: String,
    pub response: Outcome,
    pub response_time: ResponseTime,
    pub metadata: EventMetadata,
}

impl Request {
    pub fn new(key: impl Into<String>, start_time: SimTime) -> Self {
        Self {
            key: key.into(),
            response: Outcome::Pending,
            response_time: ResponseTime {
                start_time,
                end_time: start_time,
            },
            metadata: EventMetadata::default(),
        }
    }

    /// Stamp the final outcome and end time.
    pub fn complete(&mut self, outcome: Outcome, end_time: SimTime) {
        self.response = outcome;
        self.response_time.end_time = end_time;
    }

    pub fn latency(&self) -> f64 {
        self.response_time.latency()
    }
}
