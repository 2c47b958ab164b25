//! Record and sample types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One labeled image entry of a dataset
///
/// A record's identity is its position in the [`RecordStore`](crate::RecordStore);
/// records are never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record<L = String> {
    /// Location of the encoded image
    pub path: PathBuf,

    /// Class label
    pub label: L,
}

impl<L> Record<L> {
    /// Create a new record
    pub fn new(path: impl Into<PathBuf>, label: L) -> Self {
        Self {
            path: path.into(),
            label,
        }
    }

    /// Path of the encoded image
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Class label
    pub fn label(&self) -> &L {
        &self.label
    }
}

/// A decoded, optionally transformed image paired with its label
///
/// Samples are produced on demand and owned by whoever requested them.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<P, L = String> {
    /// Decoded (and transformed) pixel data
    pub pixels: P,

    /// Class label copied from the record
    pub label: L,
}

impl<P, L> Sample<P, L> {
    /// Create a new sample
    pub fn new(pixels: P, label: L) -> Self {
        Self { pixels, label }
    }

    /// Split the sample into pixels and label
    pub fn into_parts(self) -> (P, L) {
        (self.pixels, self.label)
    }
}
