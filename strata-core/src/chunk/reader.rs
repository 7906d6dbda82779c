//! Chunk reader for loading metadata and decoding series

use super::{ChunkMeta, BODY_FILE, META_FILE};
use crate::{LabelSet, Result, Sample, SeriesKey, StrataError};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Reader over one chunk directory
#[derive(Debug, Clone)]
pub struct ChunkReader {
    dir: PathBuf,
}

impl ChunkReader {
    /// Create a reader for the chunk stored in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Chunk directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load and decode the metadata file
    pub fn read_meta(&self) -> Result<ChunkMeta> {
        let path = self.dir.join(META_FILE);
        let bytes = fs::read(&path)?;
        serde_json::from_slice(&bytes).map_err(|source| StrataError::MetaDecode { path, source })
    }

    /// Samples of the first series with exactly these labels, empty if the
    /// chunk does not hold it.
    ///
    /// The metric name is ignored. Use [`read_series_key`](Self::read_series_key)
    /// when the chunk may hold the same labels under several metrics.
    pub fn read_series(&self, meta: &ChunkMeta, labels: &LabelSet) -> Result<Vec<Sample>> {
        match meta.position_of_labels(labels) {
            Some(index) => self.read_series_at(index),
            None => Ok(Vec::new()),
        }
    }

    /// Samples of the series identified by metric and labels, empty if the
    /// chunk does not hold it
    pub fn read_series_key(&self, meta: &ChunkMeta, key: &SeriesKey) -> Result<Vec<Sample>> {
        match meta.position(key) {
            Some(index) => self.read_series_at(index),
            None => Ok(Vec::new()),
        }
    }

    /// Samples on line `index` of the body, in file order.
    ///
    /// Streams the body once, skipping lines before `index` and stopping at
    /// the end of the target line.
    pub fn read_series_at(&self, index: usize) -> Result<Vec<Sample>> {
        let path = self.dir.join(BODY_FILE);
        let file = File::open(&path)?;

        let mut samples = Vec::new();
        let mut decoder = LineDecoder::new(&path, index);
        let mut line = 0usize;

        for byte in BufReader::new(file).bytes() {
            let byte = byte?;
            if byte == b'\n' {
                if line == index {
                    break;
                }
                line += 1;
                continue;
            }
            if line == index {
                if let Some(sample) = decoder.feed(byte)? {
                    samples.push(sample);
                }
            }
        }

        if line < index {
            return Err(decoder.error(format!("body ends at line {}", line)));
        }
        decoder.finish()?;

        Ok(samples)
    }
}

/// Token state for a single body line
struct LineDecoder<'a> {
    path: &'a Path,
    line: usize,
    token: Vec<u8>,
    timestamp: Option<i64>,
}

impl<'a> LineDecoder<'a> {
    fn new(path: &'a Path, line: usize) -> Self {
        Self {
            path,
            line,
            token: Vec::with_capacity(32),
            timestamp: None,
        }
    }

    fn feed(&mut self, byte: u8) -> Result<Option<Sample>> {
        match byte {
            // A leading '-' is a sign; inside the value it is part of the number
            b'-' if self.timestamp.is_none() && !self.token.is_empty() => {
                let timestamp = self.parse_token::<i64>("timestamp")?;
                self.timestamp = Some(timestamp);
                Ok(None)
            }
            b',' => {
                let timestamp = self
                    .timestamp
                    .take()
                    .ok_or_else(|| self.error("value without timestamp".into()))?;
                let value = self.parse_token::<f64>("value")?;
                Ok(Some(Sample::new(timestamp, value)))
            }
            _ => {
                self.token.push(byte);
                Ok(None)
            }
        }
    }

    fn finish(&self) -> Result<()> {
        if self.timestamp.is_some() || !self.token.is_empty() {
            return Err(self.error("unterminated sample".into()));
        }
        Ok(())
    }

    fn parse_token<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let parsed = std::str::from_utf8(&self.token)
            .ok()
            .and_then(|s| s.parse::<T>().ok());
        match parsed {
            Some(v) => {
                self.token.clear();
                Ok(v)
            }
            None => Err(self.error(format!(
                "invalid {} {:?}",
                what,
                String::from_utf8_lossy(&self.token)
            ))),
        }
    }

    fn error(&self, reason: String) -> StrataError {
        StrataError::ChunkDecode {
            chunk: self.path.to_path_buf(),
            line: self.line,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::chunk::ChunkBuilder;
    use crate::label_set;
    use tempfile::TempDir;

    fn write_body(dir: &Path, body: &str) -> ChunkReader {
        fs::write(dir.join(BODY_FILE), body).unwrap();
        ChunkReader::new(dir)
    }

    #[test]
    fn test_roundtrip_every_series() {
        let temp_dir = TempDir::new().unwrap();
        let mut buffer = Buffer::new();
        let hosts = ["mac", "win", "linux"];
        for ts in 0..200i64 {
            let host = hosts[(ts % 3) as usize];
            buffer
                .get_or_create_metric("cpu")
                .append(&label_set([("host", host)]), ts - 100, (ts as f64) * -0.25);
        }

        let expected: Vec<Vec<Sample>> = buffer.metrics()[0]
            .series()
            .iter()
            .map(|s| s.samples().iter().copied().collect())
            .collect();

        let (dir, _) = ChunkBuilder::build_from_buffer(&buffer)
            .finish(temp_dir.path())
            .unwrap();
        assert_eq!(dir, temp_dir.path().join("-100"));

        let reader = ChunkReader::new(&dir);
        let meta = reader.read_meta().unwrap();
        assert_eq!(meta.min_timestamp, -100);
        assert_eq!(meta.max_timestamp, 99);

        for (index, labels) in meta.series.iter().enumerate() {
            let samples = reader.read_series(&meta, labels).unwrap();
            assert_eq!(samples, expected[index]);
        }
    }

    #[test]
    fn test_read_missing_series() {
        let temp_dir = TempDir::new().unwrap();
        let reader = write_body(temp_dir.path(), "1-1,");
        let meta = ChunkMeta {
            min_timestamp: 1,
            max_timestamp: 1,
            series: vec![label_set([("host", "mac")])],
            metrics: vec![],
        };
        let samples = reader.read_series(&meta, &label_set([("host", "win")])).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_read_series_key_tells_metrics_apart() {
        let temp_dir = TempDir::new().unwrap();
        let reader = write_body(temp_dir.path(), "1-1,\n1-2,");
        let mac = label_set([("host", "mac")]);
        let meta = ChunkMeta {
            min_timestamp: 1,
            max_timestamp: 1,
            series: vec![mac.clone(), mac.clone()],
            metrics: vec!["cpu".into(), "ram".into()],
        };

        let ram = SeriesKey::new("ram", mac.clone());
        assert_eq!(reader.read_series_key(&meta, &ram).unwrap(), vec![Sample::new(1, 2.0)]);
        let cpu = SeriesKey::new("cpu", mac.clone());
        assert_eq!(reader.read_series_key(&meta, &cpu).unwrap(), vec![Sample::new(1, 1.0)]);
        assert!(reader
            .read_series_key(&meta, &SeriesKey::new("disk", mac.clone()))
            .unwrap()
            .is_empty());

        // Label-only lookup takes the first match
        assert_eq!(reader.read_series(&meta, &mac).unwrap(), vec![Sample::new(1, 1.0)]);
    }

    #[test]
    fn test_read_middle_line() {
        let temp_dir = TempDir::new().unwrap();
        let reader = write_body(temp_dir.path(), "1-1,4-4,\n2-0.5,3-1e3,\n5-5,");
        assert_eq!(
            reader.read_series_at(1).unwrap(),
            vec![Sample::new(2, 0.5), Sample::new(3, 1000.0)]
        );
        assert_eq!(reader.read_series_at(2).unwrap(), vec![Sample::new(5, 5.0)]);
    }

    #[test]
    fn test_corrupt_token() {
        let temp_dir = TempDir::new().unwrap();
        let reader = write_body(temp_dir.path(), "1-1,x2-2,");
        let err = reader.read_series_at(0).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_truncated_line() {
        let temp_dir = TempDir::new().unwrap();
        let reader = write_body(temp_dir.path(), "1-1,2-");
        assert!(reader.read_series_at(0).unwrap_err().is_corruption());
    }

    #[test]
    fn test_missing_line() {
        let temp_dir = TempDir::new().unwrap();
        let reader = write_body(temp_dir.path(), "1-1,\n2-2,");
        assert!(reader.read_series_at(2).unwrap_err().is_corruption());
    }

    #[test]
    fn test_corrupt_meta() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(META_FILE), b"{not json").unwrap();
        let err = ChunkReader::new(temp_dir.path()).read_meta().unwrap_err();
        assert!(matches!(err, StrataError::MetaDecode { .. }));
    }

    #[test]
    fn test_missing_body_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = ChunkReader::new(temp_dir.path()).read_series_at(0).unwrap_err();
        assert!(err.is_retryable());
    }
}
