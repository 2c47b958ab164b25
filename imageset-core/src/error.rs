//! Error types for image dataset access

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by injected decode and transform capabilities
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for image dataset operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for image dataset operations
#[derive(Error, Debug)]
pub enum Error {
    /// Index outside the record store
    #[error("Index {index} out of range for dataset of length {len}")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// Number of records in the store
        len: usize,
    },

    /// The image at `path` could not be read or decoded
    #[error("Failed to decode image '{}': {source}", path.display())]
    Decode {
        /// Path of the record being decoded
        path: PathBuf,
        /// Error reported by the decode backend
        #[source]
        source: BoxError,
    },

    /// The transform rejected the decoded image of `path`
    #[error("Transform failed for '{}': {source}", path.display())]
    Transform {
        /// Path of the record being transformed
        path: PathBuf,
        /// Error reported by the transform
        #[source]
        source: BoxError,
    },

    /// Worker count is zero or the worker index is not below it
    #[error("Invalid worker topology: worker {worker_index} of {worker_count}")]
    InvalidTopology {
        /// Number of workers
        worker_count: usize,
        /// Index of this worker
        worker_index: usize,
    },

    /// The record table could not be loaded
    #[error("Record table error: {0}")]
    Table(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error outside of sample decoding
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create an out of range error
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::OutOfRange { index, len }
    }

    /// Create a decode error for the record at `path`
    pub fn decode(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::Decode {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Create a transform error for the record at `path`
    pub fn transform(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::Transform {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Create an invalid topology error
    pub fn invalid_topology(worker_count: usize, worker_index: usize) -> Self {
        Self::InvalidTopology {
            worker_count,
            worker_index,
        }
    }

    /// Whether the error only concerns a single sample.
    ///
    /// Decode and transform failures leave the dataset and any running
    /// iterator usable; callers may skip the sample and keep pulling.
    pub fn is_sample_error(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Transform { .. })
    }
}
