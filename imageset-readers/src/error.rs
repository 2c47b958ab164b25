//! Error types for table loaders and decoders

use thiserror::Error;

/// Error type for table loaders and decoders
#[derive(Error, Debug)]
pub enum Error {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] imageset_core::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV format error
    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Image decoding error
    #[cfg(feature = "image")]
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Format error
    #[error("Format error: {0}")]
    Format(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for table loaders and decoders
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for imageset_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(inner) => inner,
            Error::Io(inner) => imageset_core::Error::Io(inner),
            Error::InvalidArgument(message) => imageset_core::Error::InvalidArgument(message),
            other => imageset_core::Error::Table(other.to_string()),
        }
    }
}
