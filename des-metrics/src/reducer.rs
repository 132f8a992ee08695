//! Reduction of a trial's raw recording into one row per sample.
//!
//! Row `i` takes the `i`-th value of every scalar series and aggregates the
//! `i`-th batch of completed requests, partitioned once by priority class and
//! once by deadline class. The number of rows is the length of the `tick`
//! series; any other series that is absent or shorter leaves undefined cells.

use serde::{Deserialize, Serialize};

use des_core::{DeadlineClass, Request};

use crate::recorder::StatsRecorder;
use crate::stats::mean;

/// Reduced output record for one sampled tick. `None` is an undefined cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlimRow {
    pub tick: Option<f64>,
    pub load_from_x: Option<f64>,
    pub load_from_y: Option<f64>,
    pub mean_latency_from_y: Option<f64>,
    pub mean_latency_from_z: Option<f64>,
    pub mean_availability_from_y: Option<f64>,
    pub mean_availability_from_z: Option<f64>,
    pub z_capacity: Option<f64>,
    pub pool_size: Option<f64>,
    pub pool_usage: Option<f64>,
    pub mean_queue_wait_time: Option<f64>,
    pub queue_size: Option<f64>,
    pub enqueue_count: Option<f64>,
    pub queue_reject_count: Option<f64>,
    pub mean_tries_per_request: Option<f64>,

    pub mean_response_p1_availability: Option<f64>,
    pub mean_response_p2_availability: Option<f64>,
    pub mean_response_p3_availability: Option<f64>,
    pub mean_response_p1_latency: Option<f64>,
    pub mean_response_p2_latency: Option<f64>,
    pub mean_response_p3_latency: Option<f64>,
    pub mean_response_g_fast_latency: Option<f64>,
    pub mean_response_g_medium_latency: Option<f64>,
    pub mean_response_g_slow_latency: Option<f64>,
    pub mean_response_g_fast_availability: Option<f64>,
    pub mean_response_g_medium_availability: Option<f64>,
    pub mean_response_g_slow_availability: Option<f64>,
}

impl SlimRow {
    /// Column names in output order.
    pub const HEADER: [&'static str; 27] = [
        "tick",
        "loadFromX",
        "loadFromY",
        "meanLatencyFromY",
        "meanLatencyFromZ",
        "meanAvailabilityFromY",
        "meanAvailabilityFromZ",
        "zCapacity",
        "poolSize",
        "poolUsage",
        "meanQueueWaitTime",
        "queueSize",
        "enqueueCount",
        "queueRejectCount",
        "meanTriesPerRequest",
        "meanResponseP1Availability",
        "meanResponseP2Availability",
        "meanResponseP3Availability",
        "meanResponseP1Latency",
        "meanResponseP2Latency",
        "meanResponseP3Latency",
        "meanResponseGFastLatency",
        "meanResponseGMediumLatency",
        "meanResponseGSlowLatency",
        "meanResponseGFastAvailability",
        "meanResponseGMediumAvailability",
        "meanResponseGSlowAvailability",
    ];

    /// Cell values in [`SlimRow::HEADER`] order.
    pub fn values(&self) -> [Option<f64>; 27] {
        [
            self.tick,
            self.load_from_x,
            self.load_from_y,
            self.mean_latency_from_y,
            self.mean_latency_from_z,
            self.mean_availability_from_y,
            self.mean_availability_from_z,
            self.z_capacity,
            self.pool_size,
            self.pool_usage,
            self.mean_queue_wait_time,
            self.queue_size,
            self.enqueue_count,
            self.queue_reject_count,
            self.mean_tries_per_request,
            self.mean_response_p1_availability,
            self.mean_response_p2_availability,
            self.mean_response_p3_availability,
            self.mean_response_p1_latency,
            self.mean_response_p2_latency,
            self.mean_response_p3_latency,
            self.mean_response_g_fast_latency,
            self.mean_response_g_medium_latency,
            self.mean_response_g_slow_latency,
            self.mean_response_g_fast_availability,
            self.mean_response_g_medium_availability,
            self.mean_response_g_slow_availability,
        ]
    }
}

/// Mean availability and mean latency of one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PartitionMeans {
    availability: Option<f64>,
    latency: Option<f64>,
}

fn partition_means<'a>(events: impl Iterator<Item = &'a Request> + Clone) -> PartitionMeans {
    PartitionMeans {
        availability: mean(events.clone().map(|e| e.response.as_availability())),
        latency: mean(events.map(Request::latency)),
    }
}

fn by_priority(batch: &[Request], priority: u8) -> PartitionMeans {
    partition_means(batch.iter().filter(move |e| e.metadata.priority == Some(priority)))
}

fn by_deadline(batch: &[Request], class: DeadlineClass) -> PartitionMeans {
    partition_means(batch.iter().filter(move |e| e.metadata.deadline_class == Some(class)))
}

/// Reduce a trial's recording to rows, one per entry of the `tick` series.
pub fn reduce(recorder: &StatsRecorder) -> Vec<SlimRow> {
    let ticks = recorder.recorded("tick");
    (0..ticks.len())
        .map(|index| reduce_row(recorder, index))
        .collect()
}

fn reduce_row(recorder: &StatsRecorder, index: usize) -> SlimRow {
    let scalar = |name: &str| recorder.value(name, index);
    let batch = recorder.event_batch(index);

    let p1 = by_priority(batch, 0);
    let p2 = by_priority(batch, 1);
    let p3 = by_priority(batch, 2);
    let fast = by_deadline(batch, DeadlineClass::Fast);
    let medium = by_deadline(batch, DeadlineClass::Medium);
    let slow = by_deadline(batch, DeadlineClass::Slow);

    SlimRow {
        tick: scalar("tick"),
        load_from_x: scalar("loadFromX"),
        load_from_y: scalar("loadFromY"),
        mean_latency_from_y: scalar("meanLatencyFromY"),
        mean_latency_from_z: scalar("meanLatencyFromZ"),
        mean_availability_from_y: scalar("meanAvailabilityFromY"),
        mean_availability_from_z: scalar("meanAvailabilityFromZ"),
        z_capacity: scalar("zCapacity"),
        pool_size: scalar("poolSize"),
        pool_usage: scalar("poolUsage"),
        mean_queue_wait_time: scalar("meanQueueWaitTime"),
        queue_size: scalar("queueSize"),
        enqueue_count: scalar("enqueueCount"),
        queue_reject_count: scalar("queueRejectCount"),
        mean_tries_per_request: scalar("meanTriesPerRequest"),
        mean_response_p1_availability: p1.availability,
        mean_response_p2_availability: p2.availability,
        mean_response_p3_availability: p3.availability,
        mean_response_p1_latency: p1.latency,
        mean_response_p2_latency: p2.latency,
        mean_response_p3_latency: p3.latency,
        mean_response_g_fast_latency: fast.latency,
        mean_response_g_medium_latency: medium.latency,
        mean_response_g_slow_latency: slow.latency,
        mean_response_g_fast_availability: fast.availability,
        mean_response_g_medium_availability: medium.availability,
        mean_response_g_slow_availability: slow.availability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use des_core::{Outcome, SimTime};

    fn completed(priority: u8, class: DeadlineClass, outcome: Outcome, latency: u64) -> Request {
        let mut request = Request::new("k-0", SimTime::from_ticks(100));
        request.metadata.priority = Some(priority);
        request.metadata.deadline_class = Some(class);
        request.complete(outcome, SimTime::from_ticks(100 + latency));
        request
    }

    #[test]
    fn header_matches_serialized_field_names() {
        let json = serde_json::to_value(SlimRow::default()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), SlimRow::HEADER.len());
        for name in SlimRow::HEADER {
            assert!(object.contains_key(name), "missing {name}");
        }
    }

    #[test]
    fn one_row_per_tick_with_index_alignment() {
        let mut recorder = StatsRecorder::new();
        for i in 1..=3 {
            recorder.record("tick", (i * 1000) as f64);
        }
        recorder.record("loadFromX", 10.0);
        recorder.record("loadFromX", 20.0);

        let rows = reduce(&recorder);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].tick, Some(1000.0));
        assert_eq!(rows[1].load_from_x, Some(20.0));
        // shorter and absent series leave undefined cells
        assert_eq!(rows[2].load_from_x, None);
        assert_eq!(rows[2].z_capacity, None);
    }

    #[test]
    fn partitions_by_priority_and_deadline_class() {
        let mut recorder = StatsRecorder::new();
        recorder.record("tick", 1000.0);
        recorder.record_events(vec![
            completed(0, DeadlineClass::Fast, Outcome::Success, 10),
            completed(0, DeadlineClass::Slow, Outcome::Failure, 30),
            completed(2, DeadlineClass::Slow, Outcome::Success, 50),
        ]);

        let row = &reduce(&recorder)[0];
        assert_eq!(row.mean_response_p1_availability, Some(0.5));
        assert_eq!(row.mean_response_p1_latency, Some(20.0));
        assert_eq!(row.mean_response_p2_availability, None);
        assert_eq!(row.mean_response_p2_latency, None);
        assert_eq!(row.mean_response_p3_availability, Some(1.0));
        assert_eq!(row.mean_response_g_fast_latency, Some(10.0));
        assert_eq!(row.mean_response_g_medium_availability, None);
        assert_eq!(row.mean_response_g_slow_latency, Some(40.0));
        assert_eq!(row.mean_response_g_slow_availability, Some(0.5));
    }

    #[test]
    fn missing_event_batches_are_empty() {
        let mut recorder = StatsRecorder::new();
        recorder.record("tick", 1000.0);
        recorder.record("tick", 2000.0);
        recorder.record_events(vec![completed(1, DeadlineClass::Medium, Outcome::Success, 5)]);

        let rows = reduce(&recorder);
        assert_eq!(rows[0].mean_response_p2_availability, Some(1.0));
        assert_eq!(rows[1].mean_response_p2_availability, None);
        assert_eq!(rows[1].mean_response_g_medium_latency, None);
    }

    #[test]
    fn untagged_requests_fall_in_no_partition() {
        let mut recorder = StatsRecorder::new();
        recorder.record("tick", 1000.0);
        let mut request = Request::new("k-1", SimTime::zero());
        request.complete(Outcome::Success, SimTime::from_ticks(3));
        recorder.record_events(vec![request]);

        let row = &reduce(&recorder)[0];
        assert!(row.values()[15..].iter().all(Option::is_none));
    }
}
