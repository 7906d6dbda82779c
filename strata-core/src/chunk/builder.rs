//! Chunk builder for flushing a buffer generation to disk

use super::{chunk_dir, ChunkEntry, ChunkMeta, ChunkReader, BODY_FILE, META_FILE};
use crate::buffer::{Buffer, Series};
use crate::{LabelSet, Result, Sample, StrataError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Transient chunk: metadata plus every buffered sample in timestamp order
#[derive(Debug, Default)]
pub struct ChunkBuilder {
    meta: ChunkMeta,
    data: Vec<ChunkEntry>,
}

impl ChunkBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a buffer generation, series in buffer order
    pub fn build_from_buffer(buffer: &Buffer) -> Self {
        let mut builder = Self::new();
        for metric in buffer.metrics() {
            for series in metric.series() {
                builder.add_series(metric.name(), series);
            }
        }
        builder
    }

    /// Assign the next series index to `series` and merge its samples in
    pub fn add_series(&mut self, metric: &str, series: &Series) -> usize {
        self.add_samples(metric, series.labels(), series.samples().iter().copied())
    }

    fn add_samples<I>(&mut self, metric: &str, labels: &LabelSet, samples: I) -> usize
    where
        I: IntoIterator<Item = Sample>,
    {
        let index = self.meta.series.len();
        self.meta.series.push(labels.clone());
        self.meta.metrics.push(metric.to_string());

        let mut local = Vec::new();
        for sample in samples {
            self.meta.observe(sample.timestamp);
            local.push(ChunkEntry::new(index, sample));
        }

        let data = std::mem::take(&mut self.data);
        self.data = merge_sorted(data, local);
        index
    }

    /// Fold the chunk stored in `reader`'s directory in ahead of everything
    /// added so far.
    ///
    /// Stored series keep their indexes. A series already present under the
    /// same metric and labels receives the new samples on its own line.
    fn merge_into_existing(self, reader: &ChunkReader) -> Result<Self> {
        let stored = reader.read_meta()?;

        let mut merged = Self::new();
        for index in 0..stored.series_count() {
            let samples = reader.read_series_at(index)?;
            merged.add_samples(stored.metric_at(index), &stored.series[index], samples);
        }

        let mut remap = Vec::with_capacity(self.meta.series_count());
        for index in 0..self.meta.series_count() {
            let key = self.meta.key_at(index);
            let target = match merged.meta.position(&key) {
                Some(target) => target,
                None => {
                    merged.meta.series.push(key.labels);
                    merged.meta.metrics.push(key.metric);
                    merged.meta.series.len() - 1
                }
            };
            remap.push(target);
        }

        let incoming: Vec<ChunkEntry> = self
            .data
            .into_iter()
            .map(|entry| {
                merged.meta.observe(entry.timestamp());
                ChunkEntry::new(remap[entry.series], entry.sample)
            })
            .collect();
        let data = std::mem::take(&mut merged.data);
        merged.data = merge_sorted(data, incoming);

        Ok(merged)
    }

    /// Metadata built so far
    pub fn meta(&self) -> &ChunkMeta {
        &self.meta
    }

    /// Merged entries
    pub fn data(&self) -> &[ChunkEntry] {
        &self.data
    }

    /// Check if no samples were added
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Encode the body: one line per series index, lines joined by `\n`
    pub fn encode_body(&self) -> String {
        let mut lines = vec![String::new(); self.meta.series.len()];
        for entry in &self.data {
            lines[entry.series].push_str(&format!(
                "{}-{},",
                entry.sample.timestamp, entry.sample.value
            ));
        }
        lines.join("\n")
    }

    /// Write the chunk under `root` and return its directory and metadata.
    ///
    /// Each file goes to a `.tmp` sibling first and is renamed into place,
    /// body before meta, so a directory holding `meta` is complete. If a
    /// chunk with the same minimum timestamp already exists, its series are
    /// merged in first and keep their indexes, so the stored meta stays valid
    /// for the new body until the new meta replaces it.
    pub fn finish(self, root: &Path) -> Result<(PathBuf, ChunkMeta)> {
        let dir = chunk_dir(root, self.meta.min_timestamp);
        let builder = if dir.join(META_FILE).is_file() {
            info!(
                "Chunk {:?} already exists, merging {} series into it",
                dir,
                self.meta.series_count()
            );
            self.merge_into_existing(&ChunkReader::new(&dir))?
        } else {
            self
        };
        fs::create_dir_all(&dir)?;
        builder.write_to(dir)
    }

    fn write_to(self, dir: PathBuf) -> Result<(PathBuf, ChunkMeta)> {
        let body = self.encode_body();
        write_atomic(&dir.join(BODY_FILE), body.as_bytes())?;

        let meta_bytes = serde_json::to_vec(&self.meta).map_err(StrataError::MetaEncode)?;
        write_atomic(&dir.join(META_FILE), &meta_bytes)?;

        debug!(
            "Wrote chunk {:?}: {} series, {} samples, {} body bytes",
            dir,
            self.meta.series.len(),
            self.data.len(),
            body.len()
        );

        Ok((dir, self.meta))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = BufWriter::new(File::create(&tmp)?);
        file.write_all(bytes)?;
        file.flush()?;
        file.get_ref().sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Merge two timestamp-ascending runs into one.
///
/// Fills from the tail backward. On equal timestamps entries of `acc` stay
/// ahead of entries of `incoming`, and each input keeps its own order.
pub fn merge_sorted(acc: Vec<ChunkEntry>, incoming: Vec<ChunkEntry>) -> Vec<ChunkEntry> {
    if acc.is_empty() {
        return incoming;
    }
    if incoming.is_empty() {
        return acc;
    }

    let mut merged = vec![ChunkEntry::default(); acc.len() + incoming.len()];
    let mut i = acc.len();
    let mut j = incoming.len();
    let mut k = merged.len();

    while i > 0 && j > 0 {
        k -= 1;
        if acc[i - 1].timestamp() > incoming[j - 1].timestamp() {
            merged[k] = acc[i - 1];
            i -= 1;
        } else {
            merged[k] = incoming[j - 1];
            j -= 1;
        }
    }
    // At most one of these runs
    merged[..i].copy_from_slice(&acc[..i]);
    merged[..j].copy_from_slice(&incoming[..j]);

    merged
}
