//! Lazy two-level result iterators
//!
//! `SeriesIterator` walks the candidate series of one find; each item is a
//! `SeriesSamples` iterator that decodes that series chunk by chunk, only
//! when it is advanced. Dropping either iterator early abandons the rest of
//! the work.

use super::LoadedChunk;
use crate::{LabelSet, Result, Sample, SeriesKey, Timestamp};
use std::sync::Arc;
use tracing::trace;

/// State shared by every iterator of one find
#[derive(Debug)]
struct FindContext {
    chunks: Vec<LoadedChunk>,
    range_start: Option<Timestamp>,
    range_end: Option<Timestamp>,
}

/// Iterator over the series matched by a find
#[derive(Debug)]
pub struct SeriesIterator {
    context: Arc<FindContext>,
    candidates: std::vec::IntoIter<SeriesKey>,
}

impl SeriesIterator {
    pub(crate) fn new(
        chunks: Vec<LoadedChunk>,
        candidates: Vec<SeriesKey>,
        range_start: Option<Timestamp>,
        range_end: Option<Timestamp>,
    ) -> Self {
        Self {
            context: Arc::new(FindContext {
                chunks,
                range_start,
                range_end,
            }),
            candidates: candidates.into_iter(),
        }
    }

    /// Number of chunks this find reads from
    pub fn chunk_count(&self) -> usize {
        self.context.chunks.len()
    }
}

impl Iterator for SeriesIterator {
    type Item = SeriesSamples;

    fn next(&mut self) -> Option<SeriesSamples> {
        let key = self.candidates.next()?;
        Some(SeriesSamples {
            context: Arc::clone(&self.context),
            key,
            next_chunk: 0,
            current: Vec::new().into_iter(),
            done: false,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.candidates.size_hint()
    }
}

impl ExactSizeIterator for SeriesIterator {}

/// Samples of one series across the chunks of a find, in chunk order.
///
/// Samples before the range start are skipped; the first sample after the
/// range end ends the iteration. A read error is yielded once, after which
/// the iterator is exhausted.
#[derive(Debug)]
pub struct SeriesSamples {
    context: Arc<FindContext>,
    key: SeriesKey,
    next_chunk: usize,
    current: std::vec::IntoIter<Sample>,
    done: bool,
}

impl SeriesSamples {
    /// Series identity
    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    /// Labels of the series
    pub fn labels(&self) -> &LabelSet {
        &self.key.labels
    }

    /// Metric the series belongs to
    pub fn metric(&self) -> &str {
        &self.key.metric
    }

    /// Decode this series from the next chunk that holds it.
    /// Returns `Ok(false)` once every chunk has been read.
    fn load_next_chunk(&mut self) -> Result<bool> {
        while let Some(chunk) = self.context.chunks.get(self.next_chunk) {
            self.next_chunk += 1;

            let Some(index) = chunk.meta.position(&self.key) else {
                continue;
            };
            let mut samples = chunk.reader.read_series_at(index)?;
            trace!(
                "Read {} samples of {} from chunk {}",
                samples.len(),
                self.key,
                chunk.id
            );

            if let Some(start) = self.context.range_start {
                let skip = samples.partition_point(|s| s.timestamp < start);
                samples.drain(..skip);
            }
            self.current = samples.into_iter();
            return Ok(true);
        }
        Ok(false)
    }
}

impl Iterator for SeriesSamples {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Result<Sample>> {
        if self.done {
            return None;
        }

        loop {
            if let Some(sample) = self.current.next() {
                if self.context.range_start.map_or(false, |s| sample.timestamp < s) {
                    continue;
                }
                if self.context.range_end.map_or(false, |e| sample.timestamp > e) {
                    self.done = true;
                    return None;
                }
                return Some(Ok(sample));
            }

            match self.load_next_chunk() {
                Ok(true) => continue,
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for SeriesSamples {}
