//! Queue components for request buffering and admission
//!
//! [`FifoQueue`] is the waiting line; [`ServiceQueue`] puts a fixed number of
//! workers in front of it. A job either starts on a free worker, waits in the
//! line, or is rejected when both are exhausted.

use crate::error::QueueError;
use des_core::SimTime;
use std::collections::VecDeque;

/// Item stored in a queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem<T> {
    pub value: T,
    /// Simulation time when the item was enqueued
    pub enqueued_at: SimTime,
}

impl<T> QueueItem<T> {
    pub fn new(value: T, enqueued_at: SimTime) -> Self {
        Self { value, enqueued_at }
    }

    /// How long this item has been in the queue, in ticks
    pub fn queue_time(&self, current_time: SimTime) -> f64 {
        current_time.ticks_since(self.enqueued_at)
    }
}

/// Core trait for waiting lines.
pub trait Queue<T> {
    /// Add an item to the queue
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Full` if the queue is at capacity.
    fn enqueue(&mut self, item: QueueItem<T>) -> Result<(), QueueError>;

    /// Remove and return the next item from the queue
    fn dequeue(&mut self) -> Option<QueueItem<T>>;

    /// Get the current number of items in the queue
    fn len(&self) -> usize;

    /// Check if the queue is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The capacity limit, or `None` if the queue is unbounded.
    fn capacity(&self) -> Option<usize>;

    /// Check if the queue is at capacity
    fn is_full(&self) -> bool {
        if let Some(cap) = self.capacity() {
            self.len() >= cap
        } else {
            false
        }
    }
}

/// First-In-First-Out (FIFO) queue implementation
///
/// # Examples
///
/// ```
/// use des_components::queue::{FifoQueue, Queue, QueueItem};
/// use des_core::SimTime;
///
/// let mut queue = FifoQueue::bounded(1);
/// queue.enqueue(QueueItem::new("a", SimTime::zero())).unwrap();
/// assert!(queue.enqueue(QueueItem::new("b", SimTime::zero())).is_err());
/// assert_eq!(queue.dequeue().unwrap().value, "a");
/// ```
#[derive(Debug, Clone)]
pub struct FifoQueue<T> {
    items: VecDeque<QueueItem<T>>,
    capacity: Option<usize>,
    total_enqueued: u64,
    total_dequeued: u64,
}

impl<T> FifoQueue<T> {
    /// Create a new FIFO queue with optional capacity limit
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
            total_enqueued: 0,
            total_dequeued: 0,
        }
    }

    /// Create a new FIFO queue with unlimited capacity
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Create a new FIFO queue with specified capacity
    pub fn bounded(capacity: usize) -> Self {
        Self::new(Some(capacity))
    }

    /// Get the total number of items ever enqueued
    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued
    }

    /// Get the total number of items ever dequeued
    pub fn total_dequeued(&self) -> u64 {
        self.total_dequeued
    }
}

impl<T> Queue<T> for FifoQueue<T> {
    fn enqueue(&mut self, item: QueueItem<T>) -> Result<(), QueueError> {
        if let Some(capacity) = self.capacity.filter(|_| self.is_full()) {
            return Err(QueueError::Full {
                capacity,
                workers: 0,
            });
        }

        self.items.push_back(item);
        self.total_enqueued += 1;
        Ok(())
    }

    fn dequeue(&mut self) -> Option<QueueItem<T>> {
        let item = self.items.pop_front();
        if item.is_some() {
            self.total_dequeued += 1;
        }
        item
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

/// Result of offering a job to a [`ServiceQueue`].
#[derive(Debug, PartialEq)]
pub enum Admission<T> {
    /// A worker was free; the caller starts the job now.
    Start(T),
    /// All workers are busy; the job waits in line.
    Queued,
}

/// Bounded FIFO line in front of a pool of workers.
///
/// The number of workers may change while jobs are in flight. Lowering it
/// never interrupts running jobs; it only delays new starts until enough of
/// them have finished.
#[derive(Debug, Clone)]
pub struct ServiceQueue<T> {
    waiting: FifoQueue<T>,
    workers: usize,
    busy: usize,
    rejected: u64,
}

impl<T> ServiceQueue<T> {
    /// `capacity` bounds the waiting line, `workers` the number of jobs in
    /// service at once.
    pub fn new(capacity: usize, workers: usize) -> Self {
        Self {
            waiting: FifoQueue::bounded(capacity),
            workers,
            busy: 0,
            rejected: 0,
        }
    }

    /// Offer a job.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Full` if every worker is busy and the line is full.
    pub fn admit(&mut self, value: T, now: SimTime) -> Result<Admission<T>, QueueError> {
        if self.busy < self.workers {
            self.busy += 1;
            return Ok(Admission::Start(value));
        }
        match self.waiting.enqueue(QueueItem::new(value, now)) {
            Ok(()) => Ok(Admission::Queued),
            Err(_) => {
                self.rejected += 1;
                Err(QueueError::Full {
                    capacity: self.capacity(),
                    workers: self.workers,
                })
            }
        }
    }

    /// Finish one job and hand back the next waiting item that may start, if
    /// any.
    pub fn release(&mut self) -> Option<QueueItem<T>> {
        self.busy = self.busy.saturating_sub(1);
        self.next_ready()
    }

    /// Change the worker count and return every waiting item that can start
    /// because of it.
    pub fn set_workers(&mut self, workers: usize) -> Vec<QueueItem<T>> {
        self.workers = workers;
        std::iter::from_fn(|| self.next_ready()).collect()
    }

    fn next_ready(&mut self) -> Option<QueueItem<T>> {
        if self.busy >= self.workers {
            return None;
        }
        let item = self.waiting.dequeue()?;
        self.busy += 1;
        Some(item)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Jobs currently in service.
    pub fn busy(&self) -> usize {
        self.busy
    }

    /// Jobs waiting for a worker.
    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    pub fn capacity(&self) -> usize {
        self.waiting.capacity().unwrap_or(usize::MAX)
    }

    pub fn total_enqueued(&self) -> u64 {
        self.waiting.total_enqueued()
    }

    pub fn total_rejected(&self) -> u64 {
        self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u32, time: u64) -> QueueItem<u32> {
        QueueItem::new(id, SimTime::from_ticks(time))
    }

    #[test]
    fn test_fifo_queue_basic_operations() {
        let mut queue = FifoQueue::unbounded();
        assert!(queue.is_empty());

        queue.enqueue(item(1, 0)).unwrap();
        queue.enqueue(item(2, 1)).unwrap();
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.dequeue().unwrap().value, 1);
        assert_eq!(queue.dequeue().unwrap().value, 2);
        assert!(queue.dequeue().is_none());
        assert_eq!(queue.total_enqueued(), 2);
        assert_eq!(queue.total_dequeued(), 2);
    }

    #[test]
    fn test_fifo_queue_capacity() {
        let mut queue = FifoQueue::bounded(2);
        queue.enqueue(item(1, 0)).unwrap();
        queue.enqueue(item(2, 0)).unwrap();
        assert!(queue.is_full());
        assert_eq!(
            queue.enqueue(item(3, 0)),
            Err(QueueError::Full {
                capacity: 2,
                workers: 0
            })
        );
    }

    #[test]
    fn test_zero_capacity_queue_rejects_everything() {
        let mut queue: FifoQueue<u32> = FifoQueue::bounded(0);
        assert!(queue.enqueue(item(1, 0)).is_err());
    }

    #[test]
    fn test_queue_item_queue_time() {
        let queued = item(1, 10);
        assert_eq!(queued.queue_time(SimTime::from_ticks(25)), 15.0);
    }

    #[test]
    fn test_service_queue_starts_queues_and_rejects() {
        let mut queue = ServiceQueue::new(1, 2);
        let now = SimTime::zero();
        assert_eq!(queue.admit(1, now), Ok(Admission::Start(1)));
        assert_eq!(queue.admit(2, now), Ok(Admission::Start(2)));
        assert_eq!(queue.admit(3, now), Ok(Admission::Queued));
        assert!(queue.admit(4, now).is_err());
        assert_eq!(queue.busy(), 2);
        assert_eq!(queue.waiting(), 1);
        assert_eq!(queue.total_rejected(), 1);

        assert_eq!(queue.release().unwrap().value, 3);
        assert_eq!(queue.busy(), 2);
        assert!(queue.release().is_none());
        assert!(queue.release().is_none());
        assert_eq!(queue.busy(), 0);
    }

    #[test]
    fn test_service_queue_worker_changes() {
        let mut queue = ServiceQueue::new(10, 1);
        let now = SimTime::zero();
        queue.admit(1, now).unwrap();
        for id in 2..=4 {
            assert_eq!(queue.admit(id, now), Ok(Admission::Queued));
        }

        let started: Vec<u32> = queue.set_workers(3).into_iter().map(|i| i.value).collect();
        assert_eq!(started, vec![2, 3]);
        assert_eq!(queue.busy(), 3);

        // shrinking leaves running jobs alone
        assert!(queue.set_workers(1).is_empty());
        assert!(queue.release().is_none());
        assert!(queue.release().is_none());
        assert_eq!(queue.release().unwrap().value, 4);
    }
}
