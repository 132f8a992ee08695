use std::any::Any;
use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

use crate::ids::EventId;
use crate::{Key, SimTime};

/// Entry stored in the scheduler: the event value, the target component and the
/// time when it is supposed to occur.
///
/// Besides being stored in the scheduler's internal priority queue, event
/// entries are simply passed to the [`crate::Components`] container, which
/// unpacks them and hands them to the right component.
#[derive(Debug)]
pub struct EventEntry {
    event_id: EventId,
    time: SimTime,
    pub(crate) component: Uuid,
    inner: Box<dyn Any>,
}

impl EventEntry {
    pub(crate) fn new<E: fmt::Debug + 'static>(
        id: EventId,
        time: SimTime,
        component: Key<E>,
        event: E,
    ) -> Self {
        EventEntry {
            event_id: id,
            time,
            component: component.id,
            inner: Box::new(event),
        }
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn id(&self) -> EventId {
        self.event_id
    }

    /// Tries to downcast the entry to one holding an event of type `E`.
    #[must_use]
    pub(crate) fn downcast<E: fmt::Debug + 'static>(&self) -> Option<EventEntryTyped<'_, E>> {
        self.inner.downcast_ref::<E>().map(|event| EventEntryTyped {
            id: self.event_id,
            time: self.time,
            component_key: Key::new_with_id(self.component),
            event,
        })
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.event_id == other.event_id
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior in BinaryHeap; ties run in scheduling order.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.event_id.cmp(&self.event_id))
    }
}

#[derive(Debug)]
pub struct EventEntryTyped<'e, E: fmt::Debug> {
    pub id: EventId,
    pub time: SimTime,
    pub component_key: Key<E>,
    pub event: &'e E,
}

type Clock = Rc<Cell<SimTime>>;

/// Read-only access to the simulation clock.
///
/// The clock itself is owned by the scheduler, while others can obtain a
/// `ClockRef` to read the current simulation time.
///
/// # Example
///
/// ```
/// # use des_core::Scheduler;
/// let scheduler = Scheduler::default();
/// let clock_ref = scheduler.clock();
/// assert_eq!(clock_ref.time(), scheduler.time());
/// ```
#[derive(Clone)]
pub struct ClockRef {
    clock: Clock,
}

impl From<Clock> for ClockRef {
    fn from(clock: Clock) -> Self {
        Self { clock }
    }
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.clock.get()
    }
}

/// Why the scheduler refuses to hand out further events.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Halt {
    Stopped,
    Aborted { time: SimTime, reason: String },
}

/// Scheduler keeps the current time and the upcoming events.
///
/// See the [crate-level documentation](index.html) for more information.
pub struct Scheduler {
    next_event_id: u64,
    events: BinaryHeap<EventEntry>,
    clock: Clock,
    halt: Option<Halt>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            next_event_id: 0,
            events: BinaryHeap::default(),
            clock: Rc::new(Cell::new(SimTime::default())),
            halt: None,
        }
    }
}

impl Scheduler {
    /// Schedules `event` to be executed for `component` at `self.time() + delay`.
    pub fn schedule<E: fmt::Debug + 'static>(
        &mut self,
        delay: SimTime,
        component: Key<E>,
        event: E,
    ) {
        self.next_event_id += 1;
        let time = self.time() + delay;
        self.events.push(EventEntry::new(
            EventId(self.next_event_id),
            time,
            component,
            event,
        ));
    }

    /// Schedules `event` to be executed for `component` at `self.time()`.
    pub fn schedule_now<E: fmt::Debug + 'static>(&mut self, component: Key<E>, event: E) {
        self.schedule(SimTime::zero(), component, event);
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.clock.get()
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        ClockRef {
            clock: Rc::clone(&self.clock),
        }
    }

    /// Number of events waiting to be processed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Ends the run gracefully once the current event has been processed.
    pub fn stop(&mut self) {
        if self.halt.is_none() {
            self.halt = Some(Halt::Stopped);
        }
    }

    /// Ends the run with an error that the driver surfaces as
    /// [`crate::SimError::Aborted`].
    pub fn abort(&mut self, reason: impl Into<String>) {
        if !matches!(self.halt, Some(Halt::Aborted { .. })) {
            self.halt = Some(Halt::Aborted {
                time: self.time(),
                reason: reason.into(),
            });
        }
    }

    /// Whether `stop` or `abort` has been called.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halt.is_some()
    }

    pub(crate) fn halt(&self) -> Option<&Halt> {
        self.halt.as_ref()
    }

    /// Returns a reference to the next scheduled event, or `None` if none are
    /// left or the scheduler has been halted.
    pub fn peek(&self) -> Option<&EventEntry> {
        if self.halt.is_some() {
            return None;
        }
        self.events.peek()
    }

    /// Removes and returns the next scheduled event, advancing the clock to it.
    pub fn pop(&mut self) -> Option<EventEntry> {
        if self.halt.is_some() {
            return None;
        }
        self.events.pop().inspect(|event| {
            self.clock.replace(event.time());
        })
    }
}
