//! Small running aggregates used by stages between samples.

/// Arithmetic mean, `None` for an empty input.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut acc = MeanAccumulator::default();
    for value in values {
        acc.push(value);
    }
    acc.mean()
}

/// Running sum and count over one sampling window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeanAccumulator {
    sum: f64,
    count: u64,
}

impl MeanAccumulator {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Return the window's mean and start a new window.
    pub fn take(&mut self) -> Option<f64> {
        let mean = self.mean();
        *self = Self::default();
        mean
    }
}
