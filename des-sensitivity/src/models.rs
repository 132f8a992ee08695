//! Resiliency models: what sits between the intermediary and the resource.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use des_components::{start_sampling, RetryStage, StageKey};

use crate::context::TrialContext;
use crate::error::ExperimentError;

/// A model kind, identified on the command line by its one-letter id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// The intermediary calls the resource directly.
    Naive,
    /// Requests carry a per-request timeout budget derived from their
    /// deadline class. The scenario's timeout stage enforces it.
    PerRequestTimeout,
    /// Up to three attempts per request.
    Retries,
    /// Failed requests are retried until they succeed.
    InfiniteRetries,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Naive,
        ModelKind::PerRequestTimeout,
        ModelKind::Retries,
        ModelKind::InfiniteRetries,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ModelKind::Naive => "A",
            ModelKind::PerRequestTimeout => "G",
            ModelKind::Retries => "H",
            ModelKind::InfiniteRetries => "J",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Naive => "Naive",
            ModelKind::PerRequestTimeout => "PerRequestTimeout",
            ModelKind::Retries => "Retries",
            ModelKind::InfiniteRetries => "InfiniteRetries",
        }
    }

    /// Add this model's stages in front of `resource`.
    pub fn build(&self, ctx: &mut TrialContext, resource: StageKey) -> Model {
        let retry = match self {
            ModelKind::Naive | ModelKind::PerRequestTimeout => None,
            ModelKind::Retries => Some(RetryStage::new(
                resource,
                RetryStage::DEFAULT_MAX_TRIES,
                ctx.recorder.clone(),
                ctx.sample_interval,
            )),
            ModelKind::InfiniteRetries => Some(RetryStage::unbounded(
                resource,
                ctx.recorder.clone(),
                ctx.sample_interval,
            )),
        };
        let entry = match retry {
            Some(stage) => {
                let retry = ctx.sim.add_component(stage);
                start_sampling(&mut ctx.sim, retry, ctx.sample_interval);
                retry
            }
            None => resource,
        };
        debug!(model = self.id(), name = self.name(), "Built model");
        Model { kind: *self, entry }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModelKind {
    type Err = ExperimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| ExperimentError::UnknownModel(s.to_string()))
    }
}

/// A built model.
#[derive(Debug, Clone, Copy)]
pub struct Model {
    pub kind: ModelKind,
    /// Stage the intermediary calls.
    pub entry: StageKey,
}
