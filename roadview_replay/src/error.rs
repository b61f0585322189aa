//! Error types for replay ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading recorded frames.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Directory listing or file read failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A frame or config file is not valid JSON for its schema
    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A frame file name does not carry a timestamp in the expected format
    #[error("Invalid frame timestamp '{stem}': {reason}")]
    InvalidTimestamp { stem: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReplayError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub fn timestamp(stem: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidTimestamp {
            stem: stem.into(),
            reason: reason.to_string(),
        }
    }
}
