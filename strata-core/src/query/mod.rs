//! Query engine for Strata
//!
//! Queries are built programmatically and answered from committed chunks
//! only. Planning lists the chunk directories, prunes them by their minimum
//! timestamp, loads the metadata of the survivors and collects the distinct
//! matching series. Samples are decoded lazily as the returned iterators are
//! advanced.

mod iter;

pub use iter::{SeriesIterator, SeriesSamples};

use crate::chunk::{chunk_dir, ChunkMeta, ChunkReader, META_FILE};
use crate::{LabelSet, Result, SeriesKey, Timestamp};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// A find request; every unset field matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Metric name filter
    pub metric: Option<String>,
    /// Inclusive lower time bound
    pub range_start: Option<Timestamp>,
    /// Inclusive upper time bound
    pub range_end: Option<Timestamp>,
    /// Exact label-set filter
    pub series: Option<LabelSet>,
}

impl Query {
    /// Create a query matching every committed sample
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one metric
    pub fn metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = Some(metric.into());
        self
    }

    /// Drop samples before `start`
    pub fn range_start(mut self, start: Timestamp) -> Self {
        self.range_start = Some(start);
        self
    }

    /// Drop samples after `end`
    pub fn range_end(mut self, end: Timestamp) -> Self {
        self.range_end = Some(end);
        self
    }

    /// Restrict to `[start, end]`
    pub fn range(self, start: Timestamp, end: Timestamp) -> Self {
        self.range_start(start).range_end(end)
    }

    /// Restrict to the series with exactly these labels
    pub fn series(mut self, labels: LabelSet) -> Self {
        self.series = Some(labels);
        self
    }

    /// Check if a series passes the metric and label filters
    pub fn matches(&self, key: &SeriesKey) -> bool {
        self.metric.as_deref().map_or(true, |m| m == key.metric)
            && self.series.as_ref().map_or(true, |s| *s == key.labels)
    }

    /// Check if a timestamp lies inside the range bounds
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.range_start.map_or(true, |s| timestamp >= s)
            && self.range_end.map_or(true, |e| timestamp <= e)
    }
}

/// A chunk that survived pruning, with its metadata loaded
#[derive(Debug)]
pub(crate) struct LoadedChunk {
    pub(crate) id: Timestamp,
    pub(crate) reader: ChunkReader,
    pub(crate) meta: ChunkMeta,
}

/// Minimum timestamps of the complete chunks under `root`, ascending.
///
/// Entries that are not directories, whose name is not an integer, or that
/// have no `meta` file (an interrupted commit) are skipped.
pub fn list_chunks(root: &Path) -> Result<Vec<Timestamp>> {
    let mut ids = Vec::new();
    if !root.exists() {
        return Ok(ids);
    }

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(id) = name.to_str().and_then(|n| n.parse::<Timestamp>().ok()) else {
            debug!("Skipping non-chunk directory {:?}", entry.path());
            continue;
        };
        if !entry.path().join(META_FILE).is_file() {
            warn!("Skipping incomplete chunk {:?}: no meta file", entry.path());
            continue;
        }
        ids.push(id);
    }

    ids.sort_unstable();
    Ok(ids)
}

/// Keep the chunks that may hold samples inside the query's time range.
///
/// `ids` must be ascending. The chunk just before the first one starting
/// after `range_start` is kept because it may straddle the bound.
pub fn prune_chunks<'a>(ids: &'a [Timestamp], query: &Query) -> &'a [Timestamp] {
    let mut ids = ids;
    if let Some(start) = query.range_start {
        let first_after = ids.partition_point(|&id| id <= start);
        ids = &ids[first_after.saturating_sub(1)..];
    }
    if let Some(end) = query.range_end {
        let first_after = ids.partition_point(|&id| id <= end);
        ids = &ids[..first_after];
    }
    ids
}

/// Distinct series of `chunks` that pass the query filters, in first-seen order
pub(crate) fn collect_candidates(chunks: &[LoadedChunk], query: &Query) -> Vec<SeriesKey> {
    let mut candidates: Vec<SeriesKey> = Vec::new();
    for chunk in chunks {
        for index in 0..chunk.meta.series_count() {
            let key = chunk.meta.key_at(index);
            if !candidates.contains(&key) && query.matches(&key) {
                candidates.push(key);
            }
        }
    }
    candidates
}

/// Plan `query` against the chunks stored under `root`
pub fn find(root: &Path, query: &Query) -> Result<SeriesIterator> {
    let ids = list_chunks(root)?;
    let surviving = prune_chunks(&ids, query);

    let mut chunks = Vec::with_capacity(surviving.len());
    for &id in surviving {
        let reader = ChunkReader::new(chunk_dir(root, id));
        let meta = reader.read_meta()?;
        if !meta.overlaps(query.range_start, query.range_end) {
            debug!("Chunk {} lies outside the query range", id);
            continue;
        }
        chunks.push(LoadedChunk { id, reader, meta });
    }

    let candidates = collect_candidates(&chunks, query);
    debug!(
        "Find planned: {} of {} chunks, {} series",
        chunks.len(),
        ids.len(),
        candidates.len()
    );

    Ok(SeriesIterator::new(
        chunks,
        candidates,
        query.range_start,
        query.range_end,
    ))
}
