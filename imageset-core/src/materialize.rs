//! Turning records into samples: decode, then transform

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::error::{BoxError, Error, Result};
use crate::record::{Record, Sample};
use crate::transform::Transform;

/// A decode backend turning an image file into pixels
///
/// The backend is expected to return a buffer with a fixed channel order
/// (3-channel RGB for the readers shipped with this workspace) and to fail
/// for missing, unreadable or invalid files.
pub trait Decode: Send + Sync {
    /// Decoded pixel buffer type
    type Pixels;

    /// Decode the image stored at `path`
    fn decode(&self, path: &Path) -> std::result::Result<Self::Pixels, BoxError>;
}

impl<F, P> Decode for F
where
    F: Fn(&Path) -> std::result::Result<P, BoxError> + Send + Sync,
{
    type Pixels = P;

    fn decode(&self, path: &Path) -> std::result::Result<P, BoxError> {
        self(path)
    }
}

/// Produces samples from records with an injected decoder and optional transform
///
/// The materializer holds no per-sample state: a failure while decoding or
/// transforming one record is returned for that record only.
pub struct Materializer<D: Decode> {
    decoder: D,
    transform: Option<Arc<dyn Transform<D::Pixels>>>,
}

impl<D: Decode> Materializer<D> {
    /// Create a materializer that only decodes
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            transform: None,
        }
    }

    /// Create a materializer that decodes and then transforms
    pub fn with_transform(decoder: D, transform: Arc<dyn Transform<D::Pixels>>) -> Self {
        Self {
            decoder,
            transform: Some(transform),
        }
    }

    /// The decode backend
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Whether a transform is applied after decoding
    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }

    /// Decode and transform one record into a sample
    pub fn materialize<L: Clone>(&self, record: &Record<L>) -> Result<Sample<D::Pixels, L>> {
        let path = record.path();

        let pixels = self.decoder.decode(path).map_err(|source| {
            warn!(path = %path.display(), error = %source, "Failed to decode image");
            Error::decode(path, source)
        })?;

        let pixels = match &self.transform {
            Some(transform) => transform.apply(pixels).map_err(|source| {
                warn!(path = %path.display(), error = %source, "Transform failed");
                Error::transform(path, source)
            })?,
            None => pixels,
        };

        trace!(path = %path.display(), "Materialized sample");
        Ok(Sample::new(pixels, record.label.clone()))
    }
}

impl<D: Decode> fmt::Debug for Materializer<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Materializer")
            .field("has_transform", &self.transform.is_some())
            .finish_non_exhaustive()
    }
}
