//! The message protocol shared by every pipeline stage.
//!
//! A stage receives a [`StageEvent::Call`] carrying a request and the key of the
//! caller, and eventually answers with exactly one [`StageEvent::Reply`] with
//! `request.response` set to success or failure. Because all stages speak the
//! same event type, any stage can sit downstream of any other.

use std::collections::HashMap;

use des_core::{Key, Outcome, Request, Scheduler, SimTime, Simulation};
use serde::{Deserialize, Serialize};

/// Identifier a caller attaches to a call so it can match the reply.
pub type CallId = u64;

/// Key of any pipeline stage.
pub type StageKey = Key<StageEvent>;

/// One-shot change to a running stage's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConfigChange {
    /// Resource worker count.
    Workers(usize),
    /// Resource baseline latency, in ticks.
    MeanLatency(f64),
    /// Resource availability outside the deadlock regime.
    Availability(f64),
    /// Arrival rate, in events per 1000 ticks.
    ArrivalRate(f64),
}

#[derive(Debug, Clone)]
pub enum StageEvent {
    Call {
        call: CallId,
        request: Request,
        reply_to: StageKey,
    },
    Reply {
        call: CallId,
        request: Request,
    },
    /// Periodic sampling instant.
    Sample,
    /// Stage-private timer.
    Timer(u64),
    Reconfigure(ConfigChange),
}

/// Send `request` back to the caller at the current instant.
pub fn reply(scheduler: &mut Scheduler, to: StageKey, call: CallId, request: Request) {
    scheduler.schedule_now(to, StageEvent::Reply { call, request });
}

/// Send `request` back to the caller marked as failed.
pub fn reply_failure(scheduler: &mut Scheduler, to: StageKey, call: CallId, mut request: Request) {
    request.response = Outcome::Failure;
    reply(scheduler, to, call, request);
}

/// Begin periodic sampling of `stage` every `interval`.
pub fn start_sampling(sim: &mut Simulation, stage: StageKey, interval: SimTime) {
    sim.schedule(interval, stage, StageEvent::Sample);
}

/// Where a forwarded call came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Upstream {
    pub call: CallId,
    pub reply_to: StageKey,
    /// When this stage forwarded the call.
    pub started: SimTime,
}

/// Calls a stage has sent downstream and not yet seen answered.
#[derive(Debug)]
pub struct CallTable<T> {
    next: CallId,
    pending: HashMap<CallId, T>,
}

impl<T> Default for CallTable<T> {
    fn default() -> Self {
        Self {
            next: 0,
            pending: HashMap::new(),
        }
    }
}

impl<T> CallTable<T> {
    /// Remember `value` under a fresh call id.
    pub fn issue(&mut self, value: T) -> CallId {
        let call = self.next;
        self.next += 1;
        self.pending.insert(call, value);
        call
    }

    pub fn take(&mut self, call: CallId) -> Option<T> {
        self.pending.remove(&call)
    }

    pub fn contains(&self, call: CallId) -> bool {
        self.pending.contains_key(&call)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Forward a call downstream and remember where to send the answer.
pub fn forward(
    table: &mut CallTable<Upstream>,
    scheduler: &mut Scheduler,
    self_id: StageKey,
    downstream: StageKey,
    upstream: (CallId, StageKey),
    request: Request,
) -> CallId {
    let call = table.issue(Upstream {
        call: upstream.0,
        reply_to: upstream.1,
        started: scheduler.time(),
    });
    scheduler.schedule_now(
        downstream,
        StageEvent::Call {
            call,
            request,
            reply_to: self_id,
        },
    );
    call
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u64) -> StageKey {
        Key::new_with_id(des_core::deterministic_uuid(0, n))
    }

    #[test]
    fn call_table_issues_fresh_ids() {
        let mut table = CallTable::default();
        let a = table.issue("a");
        let b = table.issue("b");
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.take(a), Some("a"));
        assert_eq!(table.take(a), None);
        assert!(table.contains(b));
    }

    #[test]
    fn forward_records_upstream_and_schedules_call() {
        let mut scheduler = Scheduler::default();
        let mut table = CallTable::default();
        let (me, next, caller) = (key(1), key(2), key(3));

        let call = forward(
            &mut table,
            &mut scheduler,
            me,
            next,
            (7, caller),
            Request::new("k-1", SimTime::zero()),
        );

        assert_eq!(scheduler.pending(), 1);
        let upstream = table.take(call).unwrap();
        assert_eq!(upstream.call, 7);
        assert_eq!(upstream.reply_to, caller);
        assert_eq!(upstream.started, SimTime::zero());
    }
}
