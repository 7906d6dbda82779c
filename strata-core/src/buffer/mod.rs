//! In-memory write buffer
//!
//! One buffer generation holds everything appended since the last commit,
//! organised as metric → series → samples. Metrics and series are kept in
//! insertion order; that order becomes the series order of the chunk the
//! buffer is flushed into.

mod sequence;

use crate::{LabelSet, Sample, Timestamp, Value};

pub use sequence::GrowableSequence;

/// A label set and its samples in append order
#[derive(Debug)]
pub struct Series {
    labels: LabelSet,
    samples: GrowableSequence<Sample>,
}

impl Series {
    /// Create an empty series
    pub fn new(labels: LabelSet) -> Self {
        Self {
            labels,
            samples: GrowableSequence::new(),
        }
    }

    /// Labels identifying this series
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Samples in append order
    pub fn samples(&self) -> &GrowableSequence<Sample> {
        &self.samples
    }

    /// Append a sample. Timestamps are expected to be non-decreasing.
    pub fn append(&mut self, timestamp: Timestamp, value: Value) -> usize {
        self.samples.push(Sample::new(timestamp, value))
    }

    /// Index of the first sample with a timestamp at or after `timestamp`,
    /// or `len()` if there is none. Binary search; relies on append order.
    pub fn lower_bound(&self, timestamp: Timestamp) -> usize {
        self.samples.partition_point(|s| s.timestamp < timestamp)
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A named collection of distinct series
#[derive(Debug)]
pub struct Metric {
    name: String,
    series: Vec<Series>,
    sample_count: usize,
}

impl Metric {
    /// Create an empty metric
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            series: Vec::new(),
            sample_count: 0,
        }
    }

    /// Metric name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Series in creation order
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Find the series with exactly these labels
    pub fn find_series(&self, labels: &LabelSet) -> Option<&Series> {
        self.series.iter().find(|s| s.labels == *labels)
    }

    /// Find the series with exactly these labels, creating it if missing
    pub fn get_or_create_series(&mut self, labels: &LabelSet) -> &mut Series {
        let index = match self.series.iter().position(|s| s.labels == *labels) {
            Some(index) => index,
            None => {
                self.series.push(Series::new(labels.clone()));
                self.series.len() - 1
            }
        };
        &mut self.series[index]
    }

    /// Append a sample to the series identified by `labels`
    pub fn append(&mut self, labels: &LabelSet, timestamp: Timestamp, value: Value) {
        self.get_or_create_series(labels).append(timestamp, value);
        self.sample_count += 1;
    }

    /// Number of samples across all series
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }
}

/// One buffer generation
#[derive(Debug, Default)]
pub struct Buffer {
    metrics: Vec<Metric>,
}

impl Buffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the metric named `name`, creating it if missing
    pub fn get_or_create_metric(&mut self, name: &str) -> &mut Metric {
        let index = match self.metrics.iter().position(|m| m.name == name) {
            Some(index) => index,
            None => {
                self.metrics.push(Metric::new(name));
                self.metrics.len() - 1
            }
        };
        &mut self.metrics[index]
    }

    /// Get a metric by name
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Metrics in creation order
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Total buffered samples
    pub fn sample_count(&self) -> usize {
        self.metrics.iter().map(|m| m.sample_count).sum()
    }

    /// Total distinct series
    pub fn series_count(&self) -> usize {
        self.metrics.iter().map(|m| m.series.len()).sum()
    }

    /// Check if nothing has been buffered
    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }
}
