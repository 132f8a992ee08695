//! Retry stage.
//!
//! Forwards each call and, when the answer is a failure, calls downstream
//! again until it succeeds or `max_tries` attempts have been made. An
//! unbounded stage retries until success. The caller
//! only ever sees the last answer. Every sample records the mean number of
//! attempts per finished request (`meanTriesPerRequest`).

use tracing::trace;

use des_core::{Component, Key, Outcome, Request, Scheduler, SimTime};
use des_metrics::{MeanAccumulator, SharedRecorder};

use crate::stage::{reply, CallId, CallTable, StageEvent, StageKey, Upstream};

struct Attempt {
    upstream: Upstream,
    tries: u32,
}

pub struct RetryStage {
    downstream: StageKey,
    /// `None` retries forever.
    max_tries: Option<u32>,
    recorder: SharedRecorder,
    sample_interval: SimTime,
    calls: CallTable<Attempt>,
    tries: MeanAccumulator,
    retried: u64,
}

impl RetryStage {
    pub const DEFAULT_MAX_TRIES: u32 = 3;

    pub fn new(
        downstream: StageKey,
        max_tries: u32,
        recorder: SharedRecorder,
        sample_interval: SimTime,
    ) -> Self {
        Self {
            downstream,
            max_tries: Some(max_tries.max(1)),
            recorder,
            sample_interval,
            calls: CallTable::default(),
            tries: MeanAccumulator::default(),
            retried: 0,
        }
    }

    /// Stage that keeps retrying a failed request until it succeeds.
    pub fn unbounded(downstream: StageKey, recorder: SharedRecorder, sample_interval: SimTime) -> Self {
        Self {
            max_tries: None,
            ..Self::new(downstream, 1, recorder, sample_interval)
        }
    }

    pub fn max_tries(&self) -> Option<u32> {
        self.max_tries
    }

    /// Downstream calls made beyond the first attempt.
    pub fn retried(&self) -> u64 {
        self.retried
    }

    fn attempt(&mut self, attempt: Attempt, request: Request, scheduler: &mut Scheduler, self_id: StageKey) {
        let call = self.calls.issue(attempt);
        scheduler.schedule_now(
            self.downstream,
            StageEvent::Call {
                call,
                request,
                reply_to: self_id,
            },
        );
    }

    fn answer(&mut self, call: CallId, request: &Request, scheduler: &mut Scheduler, self_id: StageKey) {
        let Some(mut attempt) = self.calls.take(call) else {
            trace!(call, "Reply for unknown call");
            return;
        };
        let may_retry = self.max_tries.map_or(true, |max| attempt.tries < max);
        if !request.response.is_success() && may_retry {
            attempt.tries += 1;
            self.retried += 1;
            trace!(key = %request.key, tries = attempt.tries, "Retrying failed request");
            let mut retry = request.clone();
            retry.response = Outcome::Pending;
            self.attempt(attempt, retry, scheduler, self_id);
            return;
        }
        self.tries.push(f64::from(attempt.tries));
        let upstream = attempt.upstream;
        reply(scheduler, upstream.reply_to, upstream.call, request.clone());
    }

    fn sample(&mut self, scheduler: &mut Scheduler, self_id: StageKey) {
        self.recorder
            .record("meanTriesPerRequest", self.tries.take());
        scheduler.schedule(self.sample_interval, self_id, StageEvent::Sample);
    }
}

impl Component for RetryStage {
    type Event = StageEvent;

    fn process_event(&mut self, self_id: Key<StageEvent>, event: &StageEvent, scheduler: &mut Scheduler) {
        match event {
            StageEvent::Call {
                call,
                request,
                reply_to,
            } => {
                let attempt = Attempt {
                    upstream: Upstream {
                        call: *call,
                        reply_to: *reply_to,
                        started: scheduler.time(),
                    },
                    tries: 1,
                };
                self.attempt(attempt, request.clone(), scheduler, self_id);
            }
            StageEvent::Reply { call, request } => self.answer(*call, request, scheduler, self_id),
            StageEvent::Sample => self.sample(scheduler, self_id),
            other => trace!(?other, "Retry stage ignoring event"),
        }
    }
}
