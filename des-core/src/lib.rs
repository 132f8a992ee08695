//! Core discrete event simulation engine.
//!
//! This crate provides the building blocks every pipeline simulation is made
//! of: simulated time, the event scheduler, component dispatch, the seeded
//! random source and the request record that flows between stages.
//!
//! # Architecture Overview
//!
//! - [`Simulation`]: owns the scheduler and the components. Use it to add
//!   components, schedule the first events and run to completion.
//! - [`Scheduler`]: handed to a component while it processes an event, so it
//!   can schedule follow-up events, stop the run or abort it.
//! - [`Component`]: anything that reacts to events of one type.
//!
//! # Basic Usage
//!
//! ```rust
//! use des_core::{Component, Executor, Key, Scheduler, SimTime, Simulation};
//!
//! #[derive(Debug)]
//! struct Ping;
//!
//! struct Counter(u32);
//!
//! impl Component for Counter {
//!     type Event = Ping;
//!
//!     fn process_event(&mut self, self_id: Key<Ping>, _: &Ping, scheduler: &mut Scheduler) {
//!         self.0 += 1;
//!         if self.0 < 3 {
//!             scheduler.schedule(SimTime::from_ticks(1), self_id, Ping);
//!         }
//!     }
//! }
//!
//! let mut simulation = Simulation::default();
//! let key = simulation.add_component(Counter(0));
//! simulation.schedule(SimTime::zero(), key, Ping);
//! simulation.execute(Executor::unbound());
//! assert_eq!(simulation.time(), SimTime::from_ticks(2));
//! ```
//!
//! # Time Model
//!
//! All timing uses [`SimTime`], measured in abstract ticks rather than
//! wall-clock time, so runs are deterministic and reproducible.

pub mod dists;
pub mod error;
pub mod execute;
pub mod ids;
pub mod logging;
pub mod randomness;
pub mod request;
pub mod scheduler;
pub mod time;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

pub use dists::{ArrivalPattern, ConstantArrivalPattern, KeyGenerator, PoissonArrivals};
pub use error::SimError;
pub use execute::{Execute, Executor};
pub use ids::{deterministic_uuid, EventId, UUID_DOMAIN_COMPONENT};
pub use logging::{
    component_span, init_simulation_logging, init_simulation_logging_with_level, trial_span,
};
pub use randomness::{DrawSite, RandomProvider, SharedRng};
pub use request::{DeadlineClass, EventMetadata, Outcome, Request, ResponseTime};
pub use scheduler::{ClockRef, EventEntry, Scheduler};
pub use time::SimTime;

use scheduler::Halt;

/// Typed handle to a registered component.
#[derive(Debug)]
pub struct Key<T> {
    id: Uuid,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Key<T> {
    pub fn new_with_id(id: Uuid) -> Self {
        Self {
            id,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get the UUID of this key
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Key<T> {}

pub trait ProcessEventEntry: Any {
    fn process_event_entry(&mut self, entry: EventEntry, scheduler: &mut Scheduler);
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub trait Component: ProcessEventEntry {
    type Event: 'static;

    fn process_event(
        &mut self,
        self_id: Key<Self::Event>,
        event: &Self::Event,
        scheduler: &mut Scheduler,
    );
}

impl<E, C> ProcessEventEntry for C
where
    E: fmt::Debug + 'static,
    C: Component<Event = E> + 'static,
{
    fn process_event_entry(&mut self, entry: EventEntry, scheduler: &mut Scheduler) {
        let typed_entry = entry
            .downcast::<E>()
            .expect("Failed to downcast event entry.");
        self.process_event(typed_entry.component_key, typed_entry.event, scheduler);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Container holding type-erased components.
///
/// Ids are derived from a registration counter, so the same build order yields
/// the same ids in every trial.
#[derive(Default)]
pub struct Components {
    components: HashMap<Uuid, Box<dyn ProcessEventEntry>>,
    registered: u64,
}

impl Components {
    /// Process the event on the component given by the event entry.
    ///
    /// Events addressed to a component that has since been removed are dropped.
    pub fn process_event_entry(&mut self, entry: EventEntry, scheduler: &mut Scheduler) {
        if let Some(component) = self.components.get_mut(&entry.component) {
            component.process_event_entry(entry, scheduler);
        } else {
            trace!(component_id = %entry.component, "Dropping event for missing component");
        }
    }

    /// Registers a new component and returns its ID.
    #[must_use]
    pub fn register<E: fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        component: C,
    ) -> Key<E> {
        let id = deterministic_uuid(UUID_DOMAIN_COMPONENT, self.registered);
        self.registered += 1;
        self.components.insert(id, Box::new(component));
        Key::new_with_id(id)
    }

    pub fn remove<E: 'static, C: Component<Event = E> + 'static>(
        &mut self,
        key: Key<E>,
    ) -> Option<C> {
        self.components.remove(&key.id).and_then(|boxed_trait| {
            let boxed_any: Box<dyn Any> = boxed_trait;
            boxed_any.downcast::<C>().ok().map(|boxed_c| *boxed_c)
        })
    }

    /// Get mutable access to a component
    pub fn get_component_mut<E: 'static, C: Component<Event = E> + 'static>(
        &mut self,
        key: Key<E>,
    ) -> Option<&mut C> {
        self.components
            .get_mut(&key.id)
            .and_then(|boxed_trait| boxed_trait.as_any_mut().downcast_mut::<C>())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Simulation struct that puts different parts of the simulation together.
///
/// See the [crate-level documentation](index.html) for more information.
#[derive(Default)]
pub struct Simulation {
    scheduler: Scheduler,
    /// Component container.
    pub components: Components,
}

impl Simulation {
    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.scheduler.time()
    }

    /// Performs one step of the simulation. Returns `true` if there was in fact an event
    /// available to process, and `false` otherwise, which signifies that the simulation
    /// ended (no events left, or a component stopped or aborted the run).
    pub fn step(&mut self) -> bool {
        match self.scheduler.pop() {
            Some(event) => {
                trace!(
                    event_time = %event.time(),
                    event_id = %event.id(),
                    "Processing simulation step"
                );
                self.components
                    .process_event_entry(event, &mut self.scheduler);
                true
            }
            None => false,
        }
    }

    /// Runs the entire simulation.
    ///
    /// The stopping condition and other execution details depend on the executor used.
    /// See [`Execute`] and [`Executor`] for more details.
    #[instrument(skip(self, executor), fields(initial_time = %self.time()))]
    pub fn execute<E: Execute>(&mut self, executor: E) {
        info!("Starting simulation execution");
        executor.execute(self);
        info!(
            final_time = %self.time(),
            pending = self.scheduler.pending(),
            "Simulation execution completed"
        );
    }

    /// Runs the simulation and reports a component abort as an error.
    ///
    /// The simulation keeps its state after an abort, so components can still
    /// be inspected or removed.
    pub fn try_execute<E: Execute>(&mut self, executor: E) -> Result<(), SimError> {
        self.execute(executor);
        match self.abort_reason() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The abort recorded by a component, if any.
    #[must_use]
    pub fn abort_reason(&self) -> Option<SimError> {
        match self.scheduler.halt() {
            Some(Halt::Aborted { time, reason }) => Some(SimError::Aborted {
                time: *time,
                reason: reason.clone(),
            }),
            _ => None,
        }
    }

    /// Whether a component stopped or aborted the run.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.scheduler.is_halted()
    }

    /// Adds a new component.
    #[must_use]
    #[instrument(skip(self, component), fields(component_type = std::any::type_name::<C>()))]
    pub fn add_component<E: fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        component: C,
    ) -> Key<E> {
        let key = self.components.register(component);
        debug!(component_id = %key.id(), "Added component to simulation");
        key
    }

    /// Remove a component: usually at the end of the simulation to peek at the state
    #[must_use]
    #[instrument(skip(self), fields(component_id = %key.id()))]
    pub fn remove_component<E: fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        key: Key<E>,
    ) -> Option<C> {
        let result = self.components.remove(key);
        if result.is_some() {
            debug!("Removed component from simulation");
        } else {
            warn!("Attempted to remove non-existent component");
        }
        result
    }

    /// Get mutable access to a component
    pub fn get_component_mut<E: fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        key: Key<E>,
    ) -> Option<&mut C> {
        self.components.get_component_mut(key)
    }

    /// Schedules a new event to be executed after `delay` in component `component`.
    pub fn schedule<E: fmt::Debug + 'static>(&mut self, delay: SimTime, component: Key<E>, event: E) {
        self.scheduler.schedule(delay, component, event);
    }

    /// Returns the time of the next scheduled event, or None if no events are
    /// scheduled or the run has been halted.
    pub fn peek_next_event_time(&self) -> Option<SimTime> {
        self.scheduler.peek().map(|e| e.time())
    }

    /// Returns a ClockRef for reading the simulation time.
    pub fn clock(&self) -> ClockRef {
        self.scheduler.clock()
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        self.scheduler.peek().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum Msg {
        Tick,
        Abort,
    }

    #[derive(Default)]
    struct Recorder {
        seen: Vec<SimTime>,
    }

    impl Component for Recorder {
        type Event = Msg;

        fn process_event(&mut self, _self_id: Key<Msg>, event: &Msg, scheduler: &mut Scheduler) {
            match event {
                Msg::Tick => self.seen.push(scheduler.time()),
                Msg::Abort => scheduler.abort("component gave up"),
            }
        }
    }

    #[test]
    fn component_ids_are_deterministic() {
        let mut a = Simulation::default();
        let mut b = Simulation::default();
        let ka1 = a.add_component(Recorder::default());
        let ka2 = a.add_component(Recorder::default());
        let kb1 = b.add_component(Recorder::default());
        let kb2 = b.add_component(Recorder::default());
        assert_eq!(ka1, kb1);
        assert_eq!(ka2, kb2);
        assert_ne!(ka1, ka2);
    }

    #[test]
    fn same_time_events_run_in_schedule_order() {
        let mut sim = Simulation::default();
        let key = sim.add_component(Recorder::default());
        sim.schedule(SimTime::from_ticks(3), key, Msg::Tick);
        sim.schedule(SimTime::from_ticks(1), key, Msg::Tick);
        sim.schedule(SimTime::from_ticks(1), key, Msg::Tick);
        sim.execute(Executor::unbound());

        let recorder: Recorder = sim.remove_component(key).unwrap();
        assert_eq!(
            recorder.seen,
            vec![
                SimTime::from_ticks(1),
                SimTime::from_ticks(1),
                SimTime::from_ticks(3)
            ]
        );
    }

    #[test]
    fn abort_surfaces_from_try_execute() {
        let mut sim = Simulation::default();
        let key = sim.add_component(Recorder::default());
        sim.schedule(SimTime::from_ticks(1), key, Msg::Tick);
        sim.schedule(SimTime::from_ticks(2), key, Msg::Abort);
        sim.schedule(SimTime::from_ticks(5), key, Msg::Tick);

        let err = sim.try_execute(Executor::unbound()).unwrap_err();
        assert_eq!(
            err,
            SimError::Aborted {
                time: SimTime::from_ticks(2),
                reason: "component gave up".to_string()
            }
        );
        assert!(sim.is_halted());
        assert!(!sim.step());

        let recorder: Recorder = sim.remove_component(key).unwrap();
        assert_eq!(recorder.seen, vec![SimTime::from_ticks(1)]);
    }

    #[test]
    fn events_for_removed_components_are_dropped() {
        let mut sim = Simulation::default();
        let key = sim.add_component(Recorder::default());
        sim.schedule(SimTime::from_ticks(1), key, Msg::Tick);
        let _: Recorder = sim.remove_component(key).unwrap();
        assert!(sim.step());
        assert!(!sim.has_pending_events());
        assert!(sim.components.is_empty());
    }
}
