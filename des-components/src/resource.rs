//! Stochastic resource stage (the `Z` tier of every pipeline).
//!
//! A bounded pool of workers behind a FIFO line. Service latency grows
//! geometrically with the number of jobs in service, and availability drops
//! to a much lower value once concurrency reaches the deadlock threshold.
//!
//! For a job started while `c` jobs are in service (itself included):
//!
//! ```text
//! mean    = base_latency + latency_a * latency_b^c
//! std_dev = std_offset + mean / std_divisor
//! latency = max(0, Normal(mean, std_dev))
//! ```
//!
//! When the latency has elapsed the job succeeds with probability
//! `deadlock_availability` if concurrency is at or past the threshold, and
//! with probability `availability` otherwise.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use des_core::{component_span, draw_site, Component, Key, Outcome, RandomProvider, Request, Scheduler, SimTime};
use des_metrics::{MeanAccumulator, SharedRecorder};

use crate::queue::{Admission, QueueItem, ServiceQueue};
use crate::stage::{reply, reply_failure, CallId, CallTable, ConfigChange, StageEvent, StageKey};

/// Numeric knobs of a [`StochasticResourceStage`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Baseline mean latency, in ticks.
    pub base_latency: f64,
    pub latency_a: f64,
    pub latency_b: f64,
    pub std_offset: f64,
    pub std_divisor: f64,
    /// Success probability below the deadlock threshold.
    pub availability: f64,
    /// Concurrency at which the deadlock regime begins.
    pub deadlock_threshold: usize,
    /// Success probability in the deadlock regime.
    pub deadlock_availability: f64,
    /// Capacity of the waiting line in front of the workers.
    pub queue_capacity: usize,
    pub workers: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            base_latency: 30.0,
            latency_a: 0.06,
            latency_b: 1.06,
            std_offset: 5.0,
            std_divisor: 500.0,
            availability: 0.9995,
            deadlock_threshold: 70,
            deadlock_availability: 0.7,
            queue_capacity: 1,
            workers: 300,
        }
    }
}

impl ResourceConfig {
    /// Expected latency with `concurrency` jobs in service.
    pub fn latency_mean(&self, concurrency: usize) -> f64 {
        self.base_latency + self.latency_a * self.latency_b.powf(concurrency as f64)
    }

    pub fn latency_std_dev(&self, mean: f64) -> f64 {
        self.std_offset + mean / self.std_divisor
    }

    /// Whether `concurrency` puts the stage in the deadlock regime.
    pub fn in_deadlock_regime(&self, concurrency: usize) -> bool {
        concurrency >= self.deadlock_threshold
    }

    /// Probability a job completing at `concurrency` succeeds.
    pub fn success_probability(&self, concurrency: usize) -> f64 {
        if self.in_deadlock_regime(concurrency) {
            self.deadlock_availability
        } else {
            self.availability
        }
    }
}

#[derive(Debug, Clone)]
struct Job {
    call: CallId,
    reply_to: StageKey,
    request: Request,
}

/// Per-window counters, reset at every sample.
#[derive(Debug, Default)]
struct Window {
    load: u64,
    enqueued: u64,
    rejected: u64,
    queue_wait: MeanAccumulator,
}

/// The stochastic backend resource.
pub struct StochasticResourceStage {
    pub name: String,
    config: ResourceConfig,
    queue: ServiceQueue<Job>,
    rng: Box<dyn RandomProvider>,
    recorder: SharedRecorder,
    sample_interval: SimTime,
    in_service: CallTable<Job>,
    concurrency: usize,
    window: Window,
    succeeded: u64,
    failed: u64,
}

impl StochasticResourceStage {
    pub fn new(
        name: impl Into<String>,
        config: ResourceConfig,
        rng: impl RandomProvider + 'static,
        recorder: SharedRecorder,
        sample_interval: SimTime,
    ) -> Self {
        Self {
            name: name.into(),
            queue: ServiceQueue::new(config.queue_capacity, config.workers),
            config,
            rng: Box::new(rng),
            recorder,
            sample_interval,
            in_service: CallTable::default(),
            concurrency: 0,
            window: Window::default(),
            succeeded: 0,
            failed: 0,
        }
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Jobs currently in service.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Jobs waiting for a worker.
    pub fn waiting(&self) -> usize {
        self.queue.waiting()
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Calls rejected because every worker was busy and the line was full.
    pub fn rejected(&self) -> u64 {
        self.queue.total_rejected()
    }

    fn admit(&mut self, job: Job, scheduler: &mut Scheduler, self_id: StageKey) {
        self.window.load += 1;
        match self.queue.admit(job.clone(), scheduler.time()) {
            Ok(Admission::Start(job)) => {
                self.window.queue_wait.push(0.0);
                self.start(job, scheduler, self_id);
            }
            Ok(Admission::Queued) => {
                self.window.enqueued += 1;
                trace!(stage = %self.name, key = %job.request.key, "Job waiting for a worker");
            }
            Err(err) => {
                self.window.rejected += 1;
                self.failed += 1;
                trace!(stage = %self.name, key = %job.request.key, %err, "Job rejected");
                reply_failure(scheduler, job.reply_to, job.call, job.request);
            }
        }
    }

    fn start_waiting(&mut self, item: QueueItem<Job>, scheduler: &mut Scheduler, self_id: StageKey) {
        self.window
            .queue_wait
            .push(item.queue_time(scheduler.time()));
        self.start(item.value, scheduler, self_id);
    }

    fn start(&mut self, job: Job, scheduler: &mut Scheduler, self_id: StageKey) {
        self.concurrency += 1;
        let mean = self.config.latency_mean(self.concurrency);
        let std_dev = self.config.latency_std_dev(mean);
        let latency = self
            .rng
            .normal(draw_site!("resource_latency"), mean, std_dev)
            .max(0.0);
        trace!(
            stage = %self.name,
            key = %job.request.key,
            concurrency = self.concurrency,
            latency,
            "Job started"
        );
        let id = self.in_service.issue(job);
        scheduler.schedule(SimTime::from_ticks_f64(latency), self_id, StageEvent::Timer(id));
    }

    fn complete(&mut self, id: u64, scheduler: &mut Scheduler, self_id: StageKey) {
        let Some(mut job) = self.in_service.take(id) else {
            return;
        };
        let draw = self.rng.uniform(draw_site!("resource_availability"));
        let outcome = if draw < self.config.success_probability(self.concurrency) {
            self.succeeded += 1;
            Outcome::Success
        } else {
            self.failed += 1;
            Outcome::Failure
        };
        self.concurrency -= 1;
        job.request.response = outcome;
        trace!(
            stage = %self.name,
            key = %job.request.key,
            ?outcome,
            concurrency = self.concurrency,
            "Job finished"
        );
        reply(scheduler, job.reply_to, job.call, job.request);

        if let Some(next) = self.queue.release() {
            self.start_waiting(next, scheduler, self_id);
        }
    }

    fn reconfigure(&mut self, change: ConfigChange, scheduler: &mut Scheduler, self_id: StageKey) {
        let _span = component_span(&self.name, scheduler.time()).entered();
        debug!(?change, "Reconfiguring resource");
        match change {
            ConfigChange::Workers(workers) => {
                self.config.workers = workers;
                for item in self.queue.set_workers(workers) {
                    self.start_waiting(item, scheduler, self_id);
                }
            }
            ConfigChange::MeanLatency(latency) => self.config.base_latency = latency,
            ConfigChange::Availability(availability) => self.config.availability = availability,
            ConfigChange::ArrivalRate(_) => {
                debug!(stage = %self.name, "Ignoring arrival rate change");
            }
        }
    }

    fn sample(&mut self, scheduler: &mut Scheduler, self_id: StageKey) {
        let window = std::mem::take(&mut self.window);
        self.recorder.record("loadFromY", window.load as f64);
        self.recorder.record("zCapacity", self.queue.workers() as f64);
        self.recorder.record("queueSize", self.queue.waiting() as f64);
        self.recorder.record("enqueueCount", window.enqueued as f64);
        self.recorder.record("queueRejectCount", window.rejected as f64);
        let mut queue_wait = window.queue_wait;
        self.recorder.record("meanQueueWaitTime", queue_wait.take());
        scheduler.schedule(self.sample_interval, self_id, StageEvent::Sample);
    }
}

impl Component for StochasticResourceStage {
    type Event = StageEvent;

    fn process_event(&mut self, self_id: Key<StageEvent>, event: &StageEvent, scheduler: &mut Scheduler) {
        match event {
            StageEvent::Call {
                call,
                request,
                reply_to,
            } => {
                let job = Job {
                    call: *call,
                    reply_to: *reply_to,
                    request: request.clone(),
                };
                self.admit(job, scheduler, self_id);
            }
            StageEvent::Timer(id) => self.complete(*id, scheduler, self_id),
            StageEvent::Reconfigure(change) => self.reconfigure(*change, scheduler, self_id),
            StageEvent::Sample => self.sample(scheduler, self_id),
            StageEvent::Reply { .. } => {
                trace!(stage = %self.name, "Resource received a reply; ignoring");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_backend_model() {
        let config = ResourceConfig::default();
        assert_eq!(config.base_latency, 30.0);
        assert_eq!(config.deadlock_threshold, 70);
        assert_eq!(config.workers, 300);
        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn expected_latency_is_monotone_in_concurrency() {
        let config = ResourceConfig::default();
        let means: Vec<f64> = (0..200).map(|c| config.latency_mean(c)).collect();
        assert!(means.windows(2).all(|w| w[0] <= w[1]));
        assert!((config.latency_mean(0) - 30.06).abs() < 1e-12);
        assert!(config.latency_std_dev(config.latency_mean(1)) > 5.0);
    }

    #[test]
    fn availability_switches_at_threshold() {
        let config = ResourceConfig::default();
        assert_eq!(config.success_probability(69), 0.9995);
        assert_eq!(config.success_probability(70), 0.7);
        assert!(config.in_deadlock_regime(71));
    }
}
