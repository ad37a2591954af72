//! Error types for the benchmark harness.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to open or write one of the append-only sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write to {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The workload's return value did not match; the run is invalid and
    /// nothing was recorded for it.
    #[error("{label}: workload returned {actual}, expected {expected}")]
    Mismatch {
        label: String,
        expected: String,
        actual: String,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BenchError>;
