//! Error types for Strata

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Strata operations
pub type Result<T> = std::result::Result<T, StrataError>;

/// Strata error types
#[derive(Error, Debug)]
pub enum StrataError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Chunk metadata could not be parsed
    #[error("Corrupt chunk meta {path:?}: {source}")]
    MetaDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Chunk metadata could not be serialized
    #[error("Failed to encode chunk meta: {0}")]
    MetaEncode(#[source] serde_json::Error),

    /// Chunk body holds a token that is not a valid sample
    #[error("Corrupt chunk body {chunk:?} at line {line}: {reason}")]
    ChunkDecode {
        chunk: PathBuf,
        line: usize,
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StrataError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, StrataError::Io(_))
    }

    /// Check if error indicates corruption of on-disk data
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            StrataError::MetaDecode { .. } | StrataError::ChunkDecode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let io = StrataError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(io.is_retryable());
        assert!(!io.is_corruption());

        let decode = StrataError::ChunkDecode {
            chunk: PathBuf::from("ingestion/10/chunk"),
            line: 2,
            reason: "bad timestamp".into(),
        };
        assert!(decode.is_corruption());
        assert!(!decode.is_retryable());
        assert!(decode.to_string().contains("line 2"));
    }
}
