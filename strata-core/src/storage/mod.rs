//! Storage engine - ties the write buffer, chunk files and queries together

mod engine;

pub use engine::{CommitOutcome, Engine, EngineStats, MetricHandle};

use crate::{Result, StrataError};
use std::path::PathBuf;

/// Storage engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ingestion root holding one directory per chunk
    pub data_dir: PathBuf,
    /// Buffered samples required before `commit` writes a chunk
    pub commit_threshold: usize,
}

impl EngineConfig {
    /// Configuration rooted at `data_dir` with default settings
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Set the commit threshold
    pub fn with_commit_threshold(mut self, threshold: usize) -> Self {
        self.commit_threshold = threshold;
        self
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.commit_threshold == 0 {
            return Err(StrataError::Config(
                "commit_threshold must be at least 1".into(),
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(StrataError::Config("data_dir must not be empty".into()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(crate::config::DATA_DIR),
            commit_threshold: crate::config::COMMIT_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.commit_threshold, 1000);
        assert_eq!(config.data_dir, PathBuf::from("ingestion"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = EngineConfig::new("data").with_commit_threshold(0);
        assert!(matches!(config.validate(), Err(StrataError::Config(_))));
        assert!(EngineConfig::new("").validate().is_err());
    }
}
