//! Open-loop arrival source that drives a pipeline.
//!
//! The source issues a fixed number of requests into the entry stage, with
//! inter-arrival gaps drawn from an [`ArrivalPattern`] and keys drawn from a
//! [`KeyGenerator`]. It stops the run once every issued request has been
//! answered, and aborts it if a watchdog deadline passes first.

use tracing::{debug, info, trace, warn};

use des_core::{
    ArrivalPattern, Component, Key, KeyGenerator, RandomProvider, Request, Scheduler, SimTime,
    Simulation,
};

use crate::stage::{ConfigChange, StageEvent, StageKey};

const ARRIVAL_TIMER: u64 = 0;
const WATCHDOG_TIMER: u64 = 1;

pub struct ArrivalSource {
    entry: StageKey,
    pattern: Box<dyn ArrivalPattern>,
    keys: KeyGenerator,
    rng: Box<dyn RandomProvider>,
    horizon: u64,
    issued: u64,
    completed: u64,
    succeeded: u64,
    arrival_pending: bool,
}

impl ArrivalSource {
    /// A source that issues `horizon` requests into `entry`.
    pub fn new(
        entry: StageKey,
        pattern: impl ArrivalPattern + 'static,
        keys: KeyGenerator,
        rng: impl RandomProvider + 'static,
        horizon: u64,
    ) -> Self {
        Self {
            entry,
            pattern: Box::new(pattern),
            keys,
            rng: Box::new(rng),
            horizon,
            issued: 0,
            completed: 0,
            succeeded: 0,
            arrival_pending: false,
        }
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Requests answered so far, successfully or not.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded
    }

    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    fn schedule_next(&mut self, scheduler: &mut Scheduler, self_id: StageKey) {
        if self.issued >= self.horizon {
            return;
        }
        match self.pattern.next_arrival_time(self.rng.as_mut()) {
            Some(gap) => {
                scheduler.schedule(gap, self_id, StageEvent::Timer(ARRIVAL_TIMER));
                self.arrival_pending = true;
            }
            None => {
                debug!(issued = self.issued, "Arrival pattern paused");
                self.arrival_pending = false;
            }
        }
    }

    fn arrive(&mut self, scheduler: &mut Scheduler, self_id: StageKey) {
        self.arrival_pending = false;
        let key = self.keys.next_key(self.rng.as_mut());
        let request = Request::new(key, scheduler.time());
        let call = self.issued;
        self.issued += 1;
        trace!(call, key = %request.key, time = %scheduler.time(), "Request arrived");
        scheduler.schedule_now(
            self.entry,
            StageEvent::Call {
                call,
                request,
                reply_to: self_id,
            },
        );
        self.schedule_next(scheduler, self_id);
    }

    fn answered(&mut self, request: &Request, scheduler: &mut Scheduler) {
        self.completed += 1;
        if request.response.is_success() {
            self.succeeded += 1;
        }
        if self.completed >= self.horizon {
            info!(
                completed = self.completed,
                succeeded = self.succeeded,
                time = %scheduler.time(),
                "All requests answered"
            );
            scheduler.stop();
        }
    }

    fn watchdog(&mut self, scheduler: &mut Scheduler) {
        if self.completed < self.horizon {
            warn!(
                issued = self.issued,
                completed = self.completed,
                "Watchdog fired before the pipeline drained"
            );
            scheduler.abort(format!(
                "{} of {} requests answered by {}",
                self.completed,
                self.horizon,
                scheduler.time()
            ));
        }
    }
}

impl Component for ArrivalSource {
    type Event = StageEvent;

    fn process_event(&mut self, self_id: Key<StageEvent>, event: &StageEvent, scheduler: &mut Scheduler) {
        match event {
            StageEvent::Timer(ARRIVAL_TIMER) => self.arrive(scheduler, self_id),
            StageEvent::Timer(WATCHDOG_TIMER) => self.watchdog(scheduler),
            StageEvent::Reply { request, .. } => self.answered(request, scheduler),
            StageEvent::Reconfigure(ConfigChange::ArrivalRate(rate)) => {
                debug!(rate, time = %scheduler.time(), "Changing arrival rate");
                self.pattern.set_rate(*rate);
                if !self.arrival_pending {
                    self.schedule_next(scheduler, self_id);
                }
            }
            other => trace!(?other, "Arrival source ignoring event"),
        }
    }
}

/// Schedule the first arrival of `source` now and, with `watchdog` set, an
/// abort at that simulated time unless every request has been answered.
pub fn start_arrivals(sim: &mut Simulation, source: StageKey, watchdog: Option<SimTime>) {
    sim.schedule(SimTime::zero(), source, StageEvent::Timer(ARRIVAL_TIMER));
    if let Some(deadline) = watchdog {
        sim.schedule(deadline, source, StageEvent::Timer(WATCHDOG_TIMER));
    }
}
