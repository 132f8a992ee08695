//! Per-request timeout stage.
//!
//! Each call gets a budget: the request's own `timeout_budget` when the entry
//! hook set one, otherwise the stage's fixed timeout. When the budget runs out
//! first the caller receives a failure. The downstream call is not cancelled;
//! its late answer is dropped here.

use tracing::trace;

use des_core::{Component, Key, Request, Scheduler, SimTime};

use crate::stage::{reply, reply_failure, CallId, CallTable, StageEvent, StageKey, Upstream};

struct Pending {
    upstream: Upstream,
    request: Request,
}

pub struct PerRequestTimeout {
    downstream: StageKey,
    /// Fixed budget in ticks for requests that carry none.
    timeout: Option<f64>,
    calls: CallTable<Pending>,
    timed_out: u64,
}

impl PerRequestTimeout {
    pub fn new(downstream: StageKey, timeout: Option<f64>) -> Self {
        Self {
            downstream,
            timeout,
            calls: CallTable::default(),
            timed_out: 0,
        }
    }

    /// Calls answered with a failure because their budget ran out.
    pub fn timed_out(&self) -> u64 {
        self.timed_out
    }

    fn budget(&self, request: &Request) -> Option<f64> {
        request.metadata.timeout_budget.or(self.timeout)
    }

    fn call(
        &mut self,
        upstream: (CallId, StageKey),
        request: &Request,
        scheduler: &mut Scheduler,
        self_id: StageKey,
    ) {
        let budget = self.budget(request);
        let call = self.calls.issue(Pending {
            upstream: Upstream {
                call: upstream.0,
                reply_to: upstream.1,
                started: scheduler.time(),
            },
            request: request.clone(),
        });
        scheduler.schedule_now(
            self.downstream,
            StageEvent::Call {
                call,
                request: request.clone(),
                reply_to: self_id,
            },
        );
        if let Some(budget) = budget {
            scheduler.schedule(SimTime::from_ticks_f64(budget), self_id, StageEvent::Timer(call));
        }
    }

    fn answer(&mut self, call: CallId, request: &Request, scheduler: &mut Scheduler) {
        match self.calls.take(call) {
            Some(pending) => {
                let upstream = pending.upstream;
                reply(scheduler, upstream.reply_to, upstream.call, request.clone());
            }
            None => trace!(call, key = %request.key, "Dropping late reply"),
        }
    }

    fn expire(&mut self, call: CallId, scheduler: &mut Scheduler) {
        if let Some(pending) = self.calls.take(call) {
            self.timed_out += 1;
            trace!(call, key = %pending.request.key, "Request timed out");
            let upstream = pending.upstream;
            reply_failure(scheduler, upstream.reply_to, upstream.call, pending.request);
        }
    }
}

impl Component for PerRequestTimeout {
    type Event = StageEvent;

    fn process_event(&mut self, self_id: Key<StageEvent>, event: &StageEvent, scheduler: &mut Scheduler) {
        match event {
            StageEvent::Call {
                call,
                request,
                reply_to,
            } => self.call((*call, *reply_to), request, scheduler, self_id),
            StageEvent::Reply { call, request } => self.answer(*call, request, scheduler),
            StageEvent::Timer(call) => self.expire(*call, scheduler),
            other => trace!(?other, "Timeout stage ignoring event"),
        }
    }
}
