//! Error types for parallel loading

use thiserror::Error;

/// Error type for parallel loading
#[derive(Error, Debug)]
pub enum Error {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] imageset_core::Error),

    /// A worker thread could not be started
    #[error("Failed to spawn worker {worker_index}: {source}")]
    Spawn {
        /// Index of the worker
        worker_index: usize,
        /// Error reported by the OS
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked
    #[error("Worker {worker_index} panicked")]
    WorkerPanicked {
        /// Index of the worker
        worker_index: usize,
    },
}

/// Result type for parallel loading
pub type Result<T> = std::result::Result<T, Error>;
