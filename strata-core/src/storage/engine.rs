//! Storage engine - top-level coordinator

use super::EngineConfig;
use crate::buffer::{Buffer, Metric};
use crate::chunk::{ChunkBuilder, ChunkMeta};
use crate::query::{Query, SeriesIterator};
use crate::{canonical, LabelSet, Result, Timestamp, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Strata storage engine.
///
/// Single-threaded: appends go to the in-memory buffer, `commit` turns the
/// buffer into one chunk directory, `find` reads committed chunks only.
pub struct Engine {
    config: EngineConfig,
    buffer: Buffer,
    chunks_written: u64,
}

/// What a commit did
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Below the threshold (or nothing buffered); nothing was written
    Skipped {
        /// Samples still buffered
        buffered: usize,
    },
    /// A chunk was written and the buffer reset
    Written {
        /// Chunk directory
        dir: PathBuf,
        /// Metadata of the written chunk
        meta: ChunkMeta,
        /// Samples written
        samples: usize,
    },
}

impl CommitOutcome {
    /// Check if a chunk was written
    pub fn is_written(&self) -> bool {
        matches!(self, CommitOutcome::Written { .. })
    }
}

impl Engine {
    /// Open an engine rooted at `config.data_dir`, creating the directory
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;

        info!(
            "Opened engine at {:?} (commit threshold {})",
            config.data_dir, config.commit_threshold
        );

        Ok(Self {
            config,
            buffer: Buffer::new(),
            chunks_written: 0,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ingestion root
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get or create a metric in the current buffer generation
    pub fn create_metric(&mut self, name: &str) -> MetricHandle<'_> {
        MetricHandle {
            metric: self.buffer.get_or_create_metric(name),
        }
    }

    /// Append one sample to `metric`
    pub fn append(&mut self, metric: &str, labels: &LabelSet, timestamp: Timestamp, value: Value) {
        self.buffer
            .get_or_create_metric(metric)
            .append(labels, timestamp, value);
    }

    /// Samples waiting for the next commit
    pub fn buffered_samples(&self) -> usize {
        self.buffer.sample_count()
    }

    /// Current buffer generation
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Write the buffer as a chunk once it holds `commit_threshold` samples
    pub fn commit(&mut self) -> Result<CommitOutcome> {
        let buffered = self.buffer.sample_count();
        if buffered < self.config.commit_threshold {
            return Ok(CommitOutcome::Skipped { buffered });
        }
        self.write_chunk()
    }

    /// Write the buffer as a chunk regardless of the threshold
    pub fn flush(&mut self) -> Result<CommitOutcome> {
        if self.buffer.is_empty() {
            return Ok(CommitOutcome::Skipped { buffered: 0 });
        }
        self.write_chunk()
    }

    fn write_chunk(&mut self) -> Result<CommitOutcome> {
        let buffer = std::mem::take(&mut self.buffer);
        let samples = buffer.sample_count();

        let builder = ChunkBuilder::build_from_buffer(&buffer);
        match builder.finish(&self.config.data_dir) {
            Ok((dir, meta)) => {
                self.chunks_written += 1;
                info!(
                    "Committed {} samples in {} series to chunk {:?}",
                    samples,
                    meta.series_count(),
                    dir
                );
                Ok(CommitOutcome::Written { dir, meta, samples })
            }
            Err(e) => {
                // Put the generation back so the caller can retry
                warn!("Commit of {} samples failed: {}", samples, e);
                self.buffer = buffer;
                Err(e)
            }
        }
    }

    /// Find committed samples matching `query`
    pub fn find(&self, query: &Query) -> Result<SeriesIterator> {
        debug!("Find {:?}", query);
        crate::query::find(&self.config.data_dir, query)
    }

    /// Log the buffered metrics, series and samples at debug level
    pub fn display_metrics(&self) {
        for metric in self.buffer.metrics() {
            debug!("metric {} ({} samples)", metric.name(), metric.sample_count());
            for series in metric.series() {
                debug!("  series {{{}}}", canonical(series.labels()));
                for sample in series.samples().iter() {
                    debug!("    {} {}", sample.timestamp, sample.value);
                }
            }
        }
    }

    /// Get engine statistics
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            metrics: self.buffer.metrics().len(),
            buffered_series: self.buffer.series_count(),
            buffered_samples: self.buffer.sample_count(),
            chunks_written: self.chunks_written,
        }
    }

    /// Release the engine. Uncommitted samples are discarded.
    pub fn close(self) {
        let buffered = self.buffer.sample_count();
        if buffered > 0 {
            warn!("Closing engine with {} uncommitted samples", buffered);
        }
        info!("Closed engine at {:?}", self.config.data_dir);
    }
}

/// Append handle for one metric of the current buffer generation
pub struct MetricHandle<'a> {
    metric: &'a mut Metric,
}

impl MetricHandle<'_> {
    /// Metric name
    pub fn name(&self) -> &str {
        self.metric.name()
    }

    /// Append one sample to the series identified by `labels`
    pub fn append(&mut self, labels: &LabelSet, timestamp: Timestamp, value: Value) {
        self.metric.append(labels, timestamp, value);
    }

    /// Samples buffered for this metric
    pub fn sample_count(&self) -> usize {
        self.metric.sample_count()
    }
}

/// Engine statistics
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStats {
    pub metrics: usize,
    pub buffered_series: usize,
    pub buffered_samples: usize,
    pub chunks_written: u64,
}
