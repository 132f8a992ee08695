use crate::{SimTime, Simulation};

/// Simulation execution trait.
pub trait Execute {
    /// Executes the simulation until some stopping condition is reached.
    /// The condition is implementation-specific.
    fn execute(self, sim: &mut Simulation);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndCondition {
    Time(SimTime),
    NoEvents,
    Steps(usize),
}

/// Executor is used for simple execution of an entire simulation.
///
/// Every variant also ends as soon as a component stops or aborts the
/// scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executor {
    end_condition: EndCondition,
}

impl Executor {
    /// Simulation will end only once there are no available events in the queue.
    #[must_use]
    pub fn unbound() -> Self {
        Self {
            end_condition: EndCondition::NoEvents,
        }
    }

    /// Simulation will be run no longer than the given time.
    /// It may terminate early if no events are available.
    #[must_use]
    pub fn timed(time: SimTime) -> Self {
        Self {
            end_condition: EndCondition::Time(time),
        }
    }

    /// Simulation will execute exactly this many steps, unless we run out of events.
    #[must_use]
    pub fn steps(steps: usize) -> Self {
        Self {
            end_condition: EndCondition::Steps(steps),
        }
    }

    /// Registers a side effect that is called _after_ each simulation step.
    #[must_use]
    pub fn side_effect<F>(self, func: F) -> ExecutorWithSideEffect<F>
    where
        F: Fn(&Simulation),
    {
        ExecutorWithSideEffect {
            end_condition: self.end_condition,
            side_effect: func,
        }
    }
}

impl Execute for Executor {
    fn execute(self, sim: &mut Simulation) {
        run_with(sim, self.end_condition, |_| {});
    }
}

pub struct ExecutorWithSideEffect<F>
where
    F: Fn(&Simulation),
{
    end_condition: EndCondition,
    side_effect: F,
}

impl<F> Execute for ExecutorWithSideEffect<F>
where
    F: Fn(&Simulation),
{
    fn execute(self, sim: &mut Simulation) {
        run_with(sim, self.end_condition, self.side_effect);
    }
}

fn run_with<F>(sim: &mut Simulation, end_condition: EndCondition, side_effect: F)
where
    F: Fn(&Simulation),
{
    let step_fn = |sim: &mut Simulation| {
        let result = sim.step();
        if result {
            side_effect(sim);
        }
        result
    };
    match end_condition {
        EndCondition::Time(time) => execute_until(sim, time, step_fn),
        EndCondition::NoEvents => execute_until_empty(sim, step_fn),
        EndCondition::Steps(steps) => execute_steps(sim, steps, step_fn),
    }
}

fn execute_until_empty<F>(sim: &mut Simulation, step: F)
where
    F: Fn(&mut Simulation) -> bool,
{
    while step(sim) {}
}

fn execute_until<F>(sim: &mut Simulation, time: SimTime, step: F)
where
    F: Fn(&mut Simulation) -> bool,
{
    while sim.peek_next_event_time().is_some_and(|t| t <= time) {
        if !step(sim) {
            break;
        }
    }
}

fn execute_steps<F>(sim: &mut Simulation, steps: usize, step: F)
where
    F: Fn(&mut Simulation) -> bool,
{
    for _ in 0..steps {
        if !step(sim) {
            break;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Component;
    use std::cell::Cell;

    struct TestComponent {
        counter: usize,
        stop_at: Option<usize>,
    }

    #[derive(Debug)]
    struct TestEvent;

    impl Component for TestComponent {
        type Event = TestEvent;

        fn process_event(
            &mut self,
            self_id: crate::Key<Self::Event>,
            _event: &Self::Event,
            scheduler: &mut crate::Scheduler,
        ) {
            self.counter += 1;
            if self.stop_at == Some(self.counter) {
                scheduler.stop();
            }
            if self.counter < 10 {
                scheduler.schedule(SimTime::from_ticks(2), self_id, TestEvent);
            }
        }
    }

    fn setup(stop_at: Option<usize>) -> (Simulation, crate::Key<TestEvent>) {
        let mut sim = Simulation::default();
        let component = sim.add_component(TestComponent { counter: 0, stop_at });
        sim.schedule(SimTime::zero(), component, TestEvent);
        (sim, component)
    }

    #[test]
    fn test_create_executor() {
        assert_eq!(
            Executor::unbound(),
            Executor {
                end_condition: EndCondition::NoEvents
            }
        );
        assert_eq!(
            Executor::timed(SimTime::zero()),
            Executor {
                end_condition: EndCondition::Time(SimTime::zero())
            }
        );
        assert_eq!(
            Executor::steps(7),
            Executor {
                end_condition: EndCondition::Steps(7)
            }
        );
    }

    #[test]
    fn test_steps() {
        let (mut sim, component) = setup(None);
        Executor::steps(10).execute(&mut sim);
        let c: TestComponent = sim.remove_component(component).unwrap();
        assert_eq!(c.counter, 10);
    }

    #[test]
    fn test_steps_stops_before() {
        let (mut sim, component) = setup(None);
        // After 10 steps there are no events, so it will not execute all 100
        Executor::steps(100).execute(&mut sim);
        let c: TestComponent = sim.remove_component(component).unwrap();
        assert_eq!(c.counter, 10);
    }

    #[test]
    fn test_timed() {
        let (mut sim, component) = setup(None);
        Executor::timed(SimTime::from_ticks(6)).execute(&mut sim);
        let c: TestComponent = sim.remove_component(component).unwrap();
        assert_eq!(c.counter, 4);
        assert_eq!(sim.time(), SimTime::from_ticks(6));
    }

    #[test]
    fn test_timed_clock_stops_early() {
        let (mut sim, component) = setup(None);
        Executor::timed(SimTime::from_ticks(5)).execute(&mut sim);
        let c: TestComponent = sim.remove_component(component).unwrap();
        assert_eq!(c.counter, 3);
        assert_eq!(sim.time(), SimTime::from_ticks(4));
    }

    #[test]
    fn test_stop_ends_unbound_run() {
        let (mut sim, component) = setup(Some(3));
        Executor::unbound().execute(&mut sim);
        let c: TestComponent = sim.remove_component(component).unwrap();
        assert_eq!(c.counter, 3);
        assert_eq!(sim.time(), SimTime::from_ticks(4));
    }

    #[test]
    fn test_side_effect_runs_after_every_step() {
        let (mut sim, _component) = setup(None);
        let steps = Cell::new(0);
        Executor::unbound()
            .side_effect(|_| steps.set(steps.get() + 1))
            .execute(&mut sim);
        assert_eq!(steps.get(), 10);
    }
}
