//! Entry stage (the `X` tier): where requests enter and leave the pipeline.
//!
//! The entry stage applies the scenario's [`MetadataHook`] to each arriving
//! request, forwards it downstream, and stamps the end time on the way back.
//! Each sample records the tick, the window's mean latency and availability as
//! seen from here, and the batch of requests completed during the window.

use tracing::{trace, warn};

use des_core::{Component, Key, Outcome, Request, Scheduler, SimTime};
use des_metrics::{MeanAccumulator, SharedRecorder};

use crate::hook::MetadataHook;
use crate::stage::{forward, reply, CallId, CallTable, StageEvent, StageKey, Upstream};

pub struct EntryStage {
    downstream: StageKey,
    hook: MetadataHook,
    recorder: SharedRecorder,
    sample_interval: SimTime,
    calls: CallTable<Upstream>,
    latency: MeanAccumulator,
    availability: MeanAccumulator,
    completed: Vec<Request>,
}

impl EntryStage {
    pub fn new(
        downstream: StageKey,
        hook: MetadataHook,
        recorder: SharedRecorder,
        sample_interval: SimTime,
    ) -> Self {
        Self {
            downstream,
            hook,
            recorder,
            sample_interval,
            calls: CallTable::default(),
            latency: MeanAccumulator::default(),
            availability: MeanAccumulator::default(),
            completed: Vec::new(),
        }
    }

    pub fn hook(&self) -> MetadataHook {
        self.hook
    }

    /// Requests forwarded and not yet answered.
    pub fn in_flight(&self) -> usize {
        self.calls.len()
    }

    fn admit(
        &mut self,
        upstream: (CallId, StageKey),
        mut request: Request,
        scheduler: &mut Scheduler,
        self_id: StageKey,
    ) {
        if let Err(err) = self.hook.apply(&mut request) {
            warn!(key = %request.key, %err, "Metadata hook failed; admitting without metadata");
        }
        forward(&mut self.calls, scheduler, self_id, self.downstream, upstream, request);
    }

    fn finish(&mut self, call: CallId, request: &Request, scheduler: &mut Scheduler) {
        let Some(upstream) = self.calls.take(call) else {
            trace!(call, "Reply for unknown call");
            return;
        };
        let mut request = request.clone();
        if request.response == Outcome::Pending {
            request.response = Outcome::Failure;
        }
        request.response_time.end_time = scheduler.time();

        self.latency.push(request.latency());
        self.availability.push(request.response.as_availability());
        self.completed.push(request.clone());
        reply(scheduler, upstream.reply_to, upstream.call, request);
    }

    fn sample(&mut self, scheduler: &mut Scheduler, self_id: StageKey) {
        self.recorder.record("tick", scheduler.time().as_ticks_f64());
        self.recorder.record("meanLatencyFromY", self.latency.take());
        self.recorder
            .record("meanAvailabilityFromY", self.availability.take());
        self.recorder
            .record_events(std::mem::take(&mut self.completed));
        scheduler.schedule(self.sample_interval, self_id, StageEvent::Sample);
    }
}

impl Component for EntryStage {
    type Event = StageEvent;

    fn process_event(&mut self, self_id: Key<StageEvent>, event: &StageEvent, scheduler: &mut Scheduler) {
        match event {
            StageEvent::Call {
                call,
                request,
                reply_to,
            } => self.admit((*call, *reply_to), request.clone(), scheduler, self_id),
            StageEvent::Reply { call, request } => self.finish(*call, request, scheduler),
            StageEvent::Sample => self.sample(scheduler, self_id),
            other => trace!(?other, "Entry stage ignoring event"),
        }
    }
}
