//! Error types for trace ingestion
//!
//! Everything past ingestion is best-effort: malformed records are skipped and
//! counted, never reported as errors. Only a trace that cannot be read at all
//! aborts a run.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to open, parse or validate a trace
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to read trace {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse trace {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid trace: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, TraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_message_names_path() {
        let err = TraceError::Io {
            path: PathBuf::from("/missing/trace.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/missing/trace.json"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_invalid_message() {
        let err = TraceError::Invalid("rank 3 listed at position 1".to_string());
        assert_eq!(err.to_string(), "Invalid trace: rank 3 listed at position 1");
    }
}
