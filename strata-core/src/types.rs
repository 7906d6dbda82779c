//! Core types for Strata

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Timestamp as supplied by the caller (unit is up to the caller)
pub type Timestamp = i64;

/// Sample value
pub type Value = f64;

/// Unordered label set identifying a series.
///
/// Two label sets are the same series when they hold the same keys with
/// equal values; `HashMap` equality already has exactly those semantics.
pub type LabelSet = HashMap<String, String>;

/// Build a label set from key/value pairs
pub fn label_set<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> LabelSet
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Canonical `k=v,k=v` rendering with keys sorted, for logs and display
pub fn canonical(labels: &LabelSet) -> String {
    let mut pairs: Vec<_> = labels.iter().collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Series identity: the metric a label set was appended under plus the labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesKey {
    /// Metric name (empty for chunks written without metric names)
    pub metric: String,
    /// Label set
    pub labels: LabelSet,
}

impl SeriesKey {
    /// Create a new series key
    pub fn new(metric: impl Into<String>, labels: LabelSet) -> Self {
        Self {
            metric: metric.into(),
            labels,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.metric, canonical(&self.labels))
    }
}

/// A single timestamped value
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Timestamp
    pub timestamp: Timestamp,
    /// Value
    pub value: Value,
}

impl Sample {
    /// Create a new sample
    pub fn new(timestamp: Timestamp, value: Value) -> Self {
        Self { timestamp, value }
    }
}

impl From<(Timestamp, Value)> for Sample {
    fn from((timestamp, value): (Timestamp, Value)) -> Self {
        Self { timestamp, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_set_equality_ignores_order() {
        let a = label_set([("a", "1"), ("b", "2")]);
        let b = label_set([("b", "2"), ("a", "1")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_label_set_subset_is_distinct() {
        let a = label_set([("a", "1")]);
        let b = label_set([("a", "1"), ("b", "2")]);
        assert_ne!(a, b);
        assert_ne!(b, a);
    }

    #[test]
    fn test_series_key_display() {
        let key = SeriesKey::new("cpu", label_set([("host", "mac")]));
        assert_eq!(key.to_string(), "cpu{host=mac}");
    }

    #[test]
    fn test_canonical() {
        let labels = label_set([("sensor", "s1"), ("location", "building-a")]);
        assert_eq!(canonical(&labels), "location=building-a,sensor=s1");
        assert_eq!(canonical(&LabelSet::new()), "");
    }
}
