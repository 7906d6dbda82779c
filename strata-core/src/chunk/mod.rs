//! Immutable on-disk chunks
//!
//! A commit turns one buffer generation into one chunk directory:
//!
//! ```text
//! <root>/<min_timestamp>/meta    JSON ChunkMeta
//! <root>/<min_timestamp>/chunk   one line per series, "<ts>-<value>," tokens
//! ```
//!
//! The position of a label set in `ChunkMeta::series` is its chunk-local
//! series index and selects the matching line of the body.

mod builder;
pub mod delta;
mod reader;

pub use builder::{merge_sorted, ChunkBuilder};
pub use reader::ChunkReader;

use crate::{LabelSet, Sample, SeriesKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the metadata file inside a chunk directory
pub const META_FILE: &str = "meta";

/// Name of the body file inside a chunk directory
pub const BODY_FILE: &str = "chunk";

/// Directory of the chunk whose minimum timestamp is `min_timestamp`
pub fn chunk_dir(root: &Path, min_timestamp: Timestamp) -> PathBuf {
    root.join(min_timestamp.to_string())
}

/// Persisted chunk metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Minimum sample timestamp in the chunk
    pub min_timestamp: Timestamp,
    /// Maximum sample timestamp in the chunk
    pub max_timestamp: Timestamp,
    /// Label sets, indexed by chunk-local series index
    pub series: Vec<LabelSet>,
    /// Metric name of each series, parallel to `series`
    #[serde(default)]
    pub metrics: Vec<String>,
}

impl ChunkMeta {
    /// Empty metadata with inverted bounds, ready to be widened
    pub fn new() -> Self {
        Self {
            min_timestamp: Timestamp::MAX,
            max_timestamp: Timestamp::MIN,
            series: Vec::new(),
            metrics: Vec::new(),
        }
    }

    /// Number of series in the chunk
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Metric name of the series at `index`
    pub fn metric_at(&self, index: usize) -> &str {
        self.metrics.get(index).map(String::as_str).unwrap_or("")
    }

    /// Series key of the series at `index`
    pub fn key_at(&self, index: usize) -> SeriesKey {
        SeriesKey::new(self.metric_at(index), self.series[index].clone())
    }

    /// Index of the first series with exactly these labels
    pub fn position_of_labels(&self, labels: &LabelSet) -> Option<usize> {
        self.series.iter().position(|s| s == labels)
    }

    /// Index of the series identified by `key`
    pub fn position(&self, key: &SeriesKey) -> Option<usize> {
        (0..self.series.len())
            .find(|&i| self.metric_at(i) == key.metric && self.series[i] == key.labels)
    }

    /// Widen the time bounds to include `timestamp`
    pub fn observe(&mut self, timestamp: Timestamp) {
        self.min_timestamp = self.min_timestamp.min(timestamp);
        self.max_timestamp = self.max_timestamp.max(timestamp);
    }

    /// Check if the chunk may hold samples inside the inclusive bounds
    pub fn overlaps(&self, start: Option<Timestamp>, end: Option<Timestamp>) -> bool {
        start.map_or(true, |s| self.max_timestamp >= s)
            && end.map_or(true, |e| self.min_timestamp <= e)
    }
}

impl Default for ChunkMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// A sample tagged with its chunk-local series index
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ChunkEntry {
    /// Chunk-local series index
    pub series: usize,
    /// Sample
    pub sample: Sample,
}

impl ChunkEntry {
    /// Create a new entry
    pub fn new(series: usize, sample: Sample) -> Self {
        Self { series, sample }
    }

    /// Timestamp of the sample
    pub fn timestamp(&self) -> Timestamp {
        self.sample.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label_set;

    fn meta() -> ChunkMeta {
        ChunkMeta {
            min_timestamp: 0,
            max_timestamp: 100,
            series: vec![
                label_set([("host", "mac")]),
                label_set([("host", "win")]),
                label_set([("host", "mac")]),
            ],
            metrics: vec!["cpu".into(), "cpu".into(), "ram".into()],
        }
    }

    #[test]
    fn test_meta_json_roundtrip() {
        let meta = meta();
        let json = serde_json::to_string(&meta).unwrap();
        let restored: ChunkMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, restored);
    }

    #[test]
    fn test_meta_without_metrics() {
        let json = r#"{"min_timestamp":1,"max_timestamp":5,"series":[{"host":"mac"}]}"#;
        let meta: ChunkMeta = serde_json::from_str(json).unwrap();
        assert!(meta.metrics.is_empty());
        assert_eq!(meta.metric_at(0), "");
        assert_eq!(meta.position(&SeriesKey::new("", label_set([("host", "mac")]))), Some(0));
    }

    #[test]
    fn test_position() {
        let meta = meta();
        let mac = label_set([("host", "mac")]);
        assert_eq!(meta.position_of_labels(&mac), Some(0));
        assert_eq!(meta.position(&SeriesKey::new("ram", mac.clone())), Some(2));
        assert_eq!(meta.position(&SeriesKey::new("disk", mac)), None);
        assert_eq!(meta.position_of_labels(&label_set([("host", "linux")])), None);
    }

    #[test]
    fn test_overlaps() {
        let meta = meta();
        assert!(meta.overlaps(None, None));
        assert!(meta.overlaps(Some(100), None));
        assert!(!meta.overlaps(Some(101), None));
        assert!(meta.overlaps(None, Some(0)));
        assert!(!meta.overlaps(Some(-10), Some(-1)));
    }

    #[test]
    fn test_chunk_dir() {
        let dir = chunk_dir(Path::new("ingestion"), -42);
        assert_eq!(dir, PathBuf::from("ingestion").join("-42"));
    }
}
