//! Record table loaders and image decoders for imageset datasets
//!
//! This crate provides the external capabilities an
//! [`ImageDataset`](imageset_core::ImageDataset) is assembled from: tables
//! that list `(path, label)` records and a decode backend that turns image
//! files into RGB pixel buffers.

mod error;

#[cfg(feature = "csv")]
pub mod csv;

pub mod folder;
pub mod image;

pub use error::{Error, Result};
pub use folder::ImageFolderTable;
pub use self::image::ImageFormat;

#[cfg(feature = "csv")]
pub use self::csv::{CsvRecordTable, CsvTableOptions};

#[cfg(feature = "image")]
pub use self::image::RgbDecoder;

// Re-export core types
pub use imageset_core::{Decode, ImageDataset, Record, RecordStore, RecordTable, Sample};
