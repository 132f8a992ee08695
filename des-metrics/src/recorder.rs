//! Time-series recorder shared by every stage of a trial.
//!
//! Stages append one value per named series at each sampling instant, and the
//! entry stage appends one batch of completed requests. Series are aligned by
//! position: the `i`-th value of every series belongs to the `i`-th sample.
//!
//! ```rust
//! use des_metrics::SharedRecorder;
//!
//! let recorder = SharedRecorder::default();
//! recorder.record("tick", 1000.0);
//! recorder.record("meanLatencyFromY", None::<f64>);
//! let snapshot = recorder.snapshot();
//! assert_eq!(snapshot.value("tick", 0), Some(1000.0));
//! assert_eq!(snapshot.value("meanLatencyFromY", 0), None);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use des_core::Request;

/// Raw per-sample content of one trial.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsRecorder {
    series: BTreeMap<String, Vec<Option<f64>>>,
    events: Vec<Vec<Request>>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to the named series. `None` and NaN are stored as
    /// undefined.
    pub fn record(&mut self, name: &str, value: impl Into<Option<f64>>) {
        let value = value.into().filter(|v| !v.is_nan());
        self.series.entry(name.to_string()).or_default().push(value);
    }

    /// Append one batch of completed requests.
    pub fn record_events(&mut self, batch: Vec<Request>) {
        self.events.push(batch);
    }

    /// The named series, empty if nothing was ever recorded under `name`.
    pub fn recorded(&self, name: &str) -> &[Option<f64>] {
        self.series.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The `index`-th value of a series, `None` if absent, short or undefined.
    pub fn value(&self, name: &str, index: usize) -> Option<f64> {
        self.recorded(name).get(index).copied().flatten()
    }

    /// The `index`-th event batch, empty if the batch series is shorter.
    pub fn event_batch(&self, index: usize) -> &[Request] {
        self.events.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn event_batches(&self) -> &[Vec<Request>] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty() && self.events.is_empty()
    }

    pub fn reset(&mut self) {
        self.series.clear();
        self.events.clear();
    }
}

/// Cloneable handle onto one trial's [`StatsRecorder`].
#[derive(Debug, Clone, Default)]
pub struct SharedRecorder {
    inner: Arc<Mutex<StatsRecorder>>,
}

impl SharedRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str, value: impl Into<Option<f64>>) {
        self.lock().record(name, value);
    }

    pub fn record_events(&self, batch: Vec<Request>) {
        self.lock().record_events(batch);
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> StatsRecorder {
        self.lock().clone()
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    fn lock(&self) -> MutexGuard<'_, StatsRecorder> {
        self.inner.lock().expect("StatsRecorder mutex poisoned")
    }
}
