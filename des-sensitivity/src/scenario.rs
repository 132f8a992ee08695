//! Scenario plans and pipeline wiring.
//!
//! A [`ScenarioPlan`] is the fully resolved description of one scenario:
//! arrival rate, keyspace, resource configuration, entry hook, optional
//! scenario-level timeout and the one deferred configuration change.
//! [`build`] turns a plan and a model into a wired pipeline inside a trial
//! context:
//!
//! ```text
//! ArrivalSource -> X -> [timeout] -> Y -> model -> Z
//! ```

use std::time::Duration;

use tracing::debug;

use des_components::{
    start_arrivals, start_sampling, ArrivalSource, ConfigChange, EntryStage, IntermediaryStage,
    MetadataHook, PerRequestTimeout, ResourceConfig, StageEvent, StageKey,
    StochasticResourceStage,
};
use des_core::{KeyGenerator, PoissonArrivals, SimTime};

use crate::context::TrialContext;
use crate::models::{Model, ModelKind};

/// Which stage a scheduled change is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTarget {
    Resource,
    Arrivals,
}

/// One-shot configuration change at a fixed simulated time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledChange {
    pub at: SimTime,
    pub target: ChangeTarget,
    pub change: ConfigChange,
}

/// Wall-clock pause taken every `every_steps` simulation steps. Simulated
/// time is unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub every_steps: u64,
    pub pause: Duration,
}

/// Models whose requests keep the hook's timeout budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetScope {
    AllModels,
    Only(ModelKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioPlan {
    pub name: &'static str,
    pub events_per_1000_ticks: f64,
    pub keys: KeyGenerator,
    pub resource: ResourceConfig,
    pub hook: MetadataHook,
    pub budget_scope: BudgetScope,
    /// Timeout of the stage between X and Y, in ticks. Requests carrying a
    /// timeout budget use that instead.
    pub timeout: Option<f64>,
    pub change: Option<ScheduledChange>,
    /// Throttle and the model it applies to.
    pub throttle: Option<(ModelKind, Throttle)>,
}

impl ScenarioPlan {
    /// The entry hook as installed for `model`.
    pub fn hook_for(&self, model: ModelKind) -> MetadataHook {
        match (self.hook, self.budget_scope) {
            (MetadataHook::Deadline { deadlines, .. }, BudgetScope::Only(kind)) if kind != model => {
                MetadataHook::Deadline {
                    deadlines,
                    timeout_buffer: None,
                }
            }
            (hook, _) => hook,
        }
    }

    pub fn throttle_for(&self, model: ModelKind) -> Option<Throttle> {
        self.throttle
            .filter(|(kind, _)| *kind == model)
            .map(|(_, throttle)| throttle)
    }
}

/// Keys of a wired pipeline.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    pub source: StageKey,
    pub entry: StageKey,
    pub timeout: Option<StageKey>,
    pub intermediary: StageKey,
    pub model: Model,
    pub resource: StageKey,
}

/// Wire `plan` with `model` into `ctx`, start sampling and arrivals, and
/// schedule the plan's deferred change.
pub fn build(
    ctx: &mut TrialContext,
    plan: &ScenarioPlan,
    model: ModelKind,
    arrivals: u64,
    watchdog: SimTime,
) -> Pipeline {
    let interval = ctx.sample_interval;

    let resource = ctx.sim.add_component(StochasticResourceStage::new(
        "z",
        plan.resource,
        ctx.rng.clone(),
        ctx.recorder.clone(),
        interval,
    ));
    let model = model.build(ctx, resource);
    let intermediary = ctx.sim.add_component(IntermediaryStage::new(
        model.entry,
        ctx.recorder.clone(),
        interval,
    ));
    let timeout = plan.timeout.map(|timeout| {
        ctx.sim
            .add_component(PerRequestTimeout::new(intermediary, Some(timeout)))
    });
    let entry = ctx.sim.add_component(EntryStage::new(
        timeout.unwrap_or(intermediary),
        plan.hook_for(model.kind),
        ctx.recorder.clone(),
        interval,
    ));
    let source = ctx.sim.add_component(ArrivalSource::new(
        entry,
        PoissonArrivals::new(plan.events_per_1000_ticks),
        plan.keys,
        ctx.rng.clone(),
        arrivals,
    ));

    for stage in [entry, intermediary, resource] {
        start_sampling(&mut ctx.sim, stage, interval);
    }
    if let Some(change) = plan.change {
        let target = match change.target {
            ChangeTarget::Resource => resource,
            ChangeTarget::Arrivals => source,
        };
        ctx.sim
            .schedule(change.at, target, StageEvent::Reconfigure(change.change));
    }
    start_arrivals(&mut ctx.sim, source, Some(watchdog));

    debug!(
        scenario = plan.name,
        model = model.kind.id(),
        rate = plan.events_per_1000_ticks,
        timeout = ?plan.timeout,
        change = ?plan.change,
        "Pipeline wired"
    );

    Pipeline {
        source,
        entry,
        timeout,
        intermediary,
        model,
        resource,
    }
}
