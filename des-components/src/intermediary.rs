//! Intermediary stage (the `Y` tier).
//!
//! Forwards every call unchanged and observes the traffic passing through:
//! the number of calls received from the entry stage (`loadFromX`), and the
//! mean latency and availability of the answers coming back from downstream.

use tracing::trace;

use des_core::{Component, Key, Request, Scheduler, SimTime};
use des_metrics::{MeanAccumulator, SharedRecorder};

use crate::stage::{forward, reply, CallId, CallTable, StageEvent, StageKey, Upstream};

pub struct IntermediaryStage {
    downstream: StageKey,
    recorder: SharedRecorder,
    sample_interval: SimTime,
    calls: CallTable<Upstream>,
    load: u64,
    latency: MeanAccumulator,
    availability: MeanAccumulator,
}

impl IntermediaryStage {
    pub fn new(downstream: StageKey, recorder: SharedRecorder, sample_interval: SimTime) -> Self {
        Self {
            downstream,
            recorder,
            sample_interval,
            calls: CallTable::default(),
            load: 0,
            latency: MeanAccumulator::default(),
            availability: MeanAccumulator::default(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.calls.len()
    }

    fn answer(&mut self, call: CallId, request: &Request, scheduler: &mut Scheduler) {
        let Some(upstream) = self.calls.take(call) else {
            trace!(call, "Reply for unknown call");
            return;
        };
        self.latency
            .push(scheduler.time().ticks_since(upstream.started));
        self.availability.push(request.response.as_availability());
        reply(scheduler, upstream.reply_to, upstream.call, request.clone());
    }

    fn sample(&mut self, scheduler: &mut Scheduler, self_id: StageKey) {
        self.recorder
            .record("loadFromX", std::mem::take(&mut self.load) as f64);
        self.recorder.record("meanLatencyFromZ", self.latency.take());
        self.recorder
            .record("meanAvailabilityFromZ", self.availability.take());
        scheduler.schedule(self.sample_interval, self_id, StageEvent::Sample);
    }
}

impl Component for IntermediaryStage {
    type Event = StageEvent;

    fn process_event(&mut self, self_id: Key<StageEvent>, event: &StageEvent, scheduler: &mut Scheduler) {
        match event {
            StageEvent::Call {
                call,
                request,
                reply_to,
            } => {
                self.load += 1;
                forward(
                    &mut self.calls,
                    scheduler,
                    self_id,
                    self.downstream,
                    (*call, *reply_to),
                    request.clone(),
                );
            }
            StageEvent::Reply { call, request } => self.answer(*call, request, scheduler),
            StageEvent::Sample => self.sample(scheduler, self_id),
            other => trace!(?other, "Intermediary ignoring event"),
        }
    }
}
