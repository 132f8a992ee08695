//! Parameter injectors: numeric vector in, scenario plan out.
//!
//! | injector        | scenario             | vector                                             | step at 8000·D      |
//! |-----------------|----------------------|----------------------------------------------------|---------------------|
//! | `latency2`      | `SteadyLatency`      | `[load, latency, availability, newLatency]`        | resource latency    |
//! | `load2`         | `SteadyLoad`         | `[load, latency, availability, newLoad]`           | arrival rate        |
//! | `availability2` | `SteadyAvailability` | `[load, latency, availability, newAvailability]`   | resource availability |
//! | `capacity`      | `SteadyCapacity`     | `[load, workers, latency, availability, newWorkers]` | resource workers  |
//! | `steady-latency`| `SteadyLatency`      | ignored                                            | none                |
//!
//! Loads are divided by the tick dilation `D`; latencies and worker counts are
//! floored.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use des_components::{ConfigChange, MetadataHook, ResourceConfig};
use des_core::{KeyGenerator, SimTime};

use crate::error::ExperimentError;
use crate::models::ModelKind;
use crate::scenario::{BudgetScope, ChangeTarget, ScenarioPlan, ScheduledChange, Throttle};

/// Tick of the deferred change, before dilation.
pub const CHANGE_AT_TICKS: f64 = 8000.0;
/// Added to a deadline to form a request's timeout budget.
pub const TIMEOUT_BUFFER: f64 = 10.0;

const KEYSPACE_MEAN: f64 = 10_000.0;
const KEYSPACE_STD: f64 = 500.0;
const RESOURCE_WORKERS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectorKind {
    Latency2,
    Load2,
    Availability2,
    Capacity,
    SteadyLatency,
}

impl InjectorKind {
    pub const ALL: [InjectorKind; 5] = [
        InjectorKind::Latency2,
        InjectorKind::Load2,
        InjectorKind::Availability2,
        InjectorKind::Capacity,
        InjectorKind::SteadyLatency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InjectorKind::Latency2 => "latency2",
            InjectorKind::Load2 => "load2",
            InjectorKind::Availability2 => "availability2",
            InjectorKind::Capacity => "capacity",
            InjectorKind::SteadyLatency => "steady-latency",
        }
    }

    pub fn scenario_name(&self) -> &'static str {
        match self {
            InjectorKind::Latency2 | InjectorKind::SteadyLatency => "SteadyLatency",
            InjectorKind::Load2 => "SteadyLoad",
            InjectorKind::Availability2 => "SteadyAvailability",
            InjectorKind::Capacity => "SteadyCapacity",
        }
    }

    /// Number of parameters the injector reads.
    pub fn arity(&self) -> usize {
        match self {
            InjectorKind::Capacity => 5,
            InjectorKind::SteadyLatency => 0,
            _ => 4,
        }
    }

    /// Resolve `params` into a plan, with `dilation` as the tick dilation.
    pub fn plan(&self, params: &[f64], dilation: f64) -> Result<ScenarioPlan, ExperimentError> {
        if params.len() < self.arity() {
            return Err(ExperimentError::MissingParameter {
                injector: self.name(),
                index: params.len(),
                given: params.len(),
            });
        }
        let p = |index: usize| params[index];
        let change_at = SimTime::from_ticks_f64(CHANGE_AT_TICKS * dilation);
        let at_change = |target, change| {
            Some(ScheduledChange {
                at: change_at,
                target,
                change,
            })
        };
        let priority = MetadataHook::Priority;

        let plan = match self {
            InjectorKind::Latency2 => ScenarioPlan {
                hook: MetadataHook::deadline_with_timeout(
                    [40.0 * dilation, 45.0 * dilation, 50.0 * dilation],
                    TIMEOUT_BUFFER,
                ),
                budget_scope: BudgetScope::Only(ModelKind::PerRequestTimeout),
                timeout: Some(300.0 * dilation + 10.0),
                change: at_change(
                    ChangeTarget::Resource,
                    ConfigChange::MeanLatency(p(3).floor()),
                ),
                ..self.steady(p(0), p(1), p(2), RESOURCE_WORKERS, dilation)
            },
            InjectorKind::Load2 => ScenarioPlan {
                hook: priority,
                change: at_change(
                    ChangeTarget::Arrivals,
                    ConfigChange::ArrivalRate(p(3) / dilation),
                ),
                ..self.steady(p(0), p(1), p(2), RESOURCE_WORKERS, dilation)
            },
            InjectorKind::Availability2 => ScenarioPlan {
                hook: priority,
                change: at_change(ChangeTarget::Resource, ConfigChange::Availability(p(3))),
                throttle: Some((
                    ModelKind::InfiniteRetries,
                    Throttle {
                        every_steps: 1000,
                        pause: Duration::from_millis(3),
                    },
                )),
                ..self.steady(p(0), p(1), p(2), RESOURCE_WORKERS, dilation)
            },
            InjectorKind::Capacity => ScenarioPlan {
                hook: priority,
                change: at_change(
                    ChangeTarget::Resource,
                    ConfigChange::Workers(floor_count(p(4))),
                ),
                ..self.steady(p(0), p(2), p(3), floor_count(p(1)), dilation)
            },
            InjectorKind::SteadyLatency => ScenarioPlan {
                name: self.scenario_name(),
                events_per_1000_ticks: 400.0 / dilation,
                keys: KeyGenerator::new(KEYSPACE_MEAN, KEYSPACE_STD),
                resource: ResourceConfig::default(),
                hook: MetadataHook::deadline_with_timeout(
                    [55.0 * dilation, 60.0 * dilation, 65.0 * dilation],
                    TIMEOUT_BUFFER,
                ),
                budget_scope: BudgetScope::AllModels,
                timeout: Some(60.0 * dilation + 10.0),
                change: None,
                throttle: None,
            },
        };
        Ok(plan)
    }

    /// Settings every vector-driven injector shares.
    fn steady(
        &self,
        load: f64,
        latency: f64,
        availability: f64,
        workers: usize,
        dilation: f64,
    ) -> ScenarioPlan {
        ScenarioPlan {
            name: self.scenario_name(),
            events_per_1000_ticks: load / dilation,
            keys: KeyGenerator::new(KEYSPACE_MEAN, KEYSPACE_STD),
            resource: ResourceConfig {
                base_latency: latency.floor(),
                availability,
                queue_capacity: 0,
                workers,
                ..ResourceConfig::default()
            },
            hook: MetadataHook::None,
            budget_scope: BudgetScope::AllModels,
            timeout: None,
            change: None,
            throttle: None,
        }
    }
}

fn floor_count(value: f64) -> usize {
    value.floor().max(0.0) as usize
}

impl fmt::Display for InjectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InjectorKind {
    type Err = ExperimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InjectorKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ExperimentError::UnknownInjector(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: f64 = 3.0;

    #[test]
    fn names_round_trip() {
        for kind in InjectorKind::ALL {
            assert_eq!(kind.name().parse::<InjectorKind>().unwrap(), kind);
        }
        assert!(matches!(
            "latency3".parse::<InjectorKind>(),
            Err(ExperimentError::UnknownInjector(name)) if name == "latency3"
        ));
    }

    #[test]
    fn latency2_steps_mean_latency() {
        let plan = InjectorKind::Latency2
            .plan(&[400.0, 50.7, 0.99, 80.2], D)
            .unwrap();
        assert_eq!(plan.name, "SteadyLatency");
        assert!((plan.events_per_1000_ticks - 400.0 / 3.0).abs() < 1e-12);
        assert_eq!(plan.resource.base_latency, 50.0);
        assert_eq!(plan.resource.availability, 0.99);
        assert_eq!(plan.resource.workers, 500);
        assert_eq!(plan.resource.queue_capacity, 0);
        assert_eq!(plan.timeout, Some(910.0));
        assert_eq!(
            plan.change,
            Some(ScheduledChange {
                at: SimTime::from_ticks(24_000),
                target: ChangeTarget::Resource,
                change: ConfigChange::MeanLatency(80.0),
            })
        );
        assert_eq!(
            plan.hook,
            MetadataHook::Deadline {
                deadlines: [120.0, 135.0, 150.0],
                timeout_buffer: Some(10.0)
            }
        );
        assert_eq!(plan.budget_scope, BudgetScope::Only(ModelKind::PerRequestTimeout));
    }

    #[test]
    fn load2_steps_arrival_rate() {
        let plan = InjectorKind::Load2.plan(&[300.0, 30.0, 1.0, 600.0], D).unwrap();
        assert_eq!(plan.name, "SteadyLoad");
        assert_eq!(plan.hook, MetadataHook::Priority);
        assert_eq!(plan.timeout, None);
        let change = plan.change.unwrap();
        assert_eq!(change.target, ChangeTarget::Arrivals);
        assert_eq!(change.change, ConfigChange::ArrivalRate(200.0));
    }

    #[test]
    fn availability2_throttles_infinite_retries() {
        let plan = InjectorKind::Availability2
            .plan(&[300.0, 30.0, 0.999, 0.5], D)
            .unwrap();
        assert_eq!(plan.name, "SteadyAvailability");
        assert_eq!(
            plan.change.unwrap().change,
            ConfigChange::Availability(0.5)
        );
        assert!(plan.throttle_for(ModelKind::InfiniteRetries).is_some());
        assert!(plan.throttle_for(ModelKind::Retries).is_none());
        assert!(plan.throttle_for(ModelKind::Naive).is_none());
    }

    #[test]
    fn capacity_steps_workers() {
        let plan = InjectorKind::Capacity
            .plan(&[300.0, 28.9, 40.0, 0.99, 12.5], D)
            .unwrap();
        assert_eq!(plan.name, "SteadyCapacity");
        assert_eq!(plan.resource.workers, 28);
        assert_eq!(plan.resource.base_latency, 40.0);
        assert_eq!(plan.resource.availability, 0.99);
        assert_eq!(plan.change.unwrap().change, ConfigChange::Workers(12));
    }

    #[test]
    fn steady_latency_ignores_the_vector() {
        let plan = InjectorKind::SteadyLatency.plan(&[], D).unwrap();
        assert_eq!(plan.timeout, Some(190.0));
        assert_eq!(plan.resource, ResourceConfig::default());
        assert!(plan.change.is_none());
        assert_eq!(plan.hook_for(ModelKind::Naive), plan.hook);
    }

    #[test]
    fn short_vector_is_reported() {
        let err = InjectorKind::Capacity.plan(&[1.0, 2.0], D).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Injector capacity needs parameter #2, got 2 parameters"
        );
    }
}
