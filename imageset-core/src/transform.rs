//! Transform trait and composition for decoded images

use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;

/// A transformation applied to a decoded image
///
/// Transforms are supplied by the caller and treated as pure: the dataset
/// may call them from several workers at once and never retries them.
pub trait Transform<P>: Send + Sync {
    /// Transform one decoded image
    fn apply(&self, pixels: P) -> Result<P, BoxError>;
}

impl<P, F> Transform<P> for F
where
    F: Fn(P) -> Result<P, BoxError> + Send + Sync,
{
    fn apply(&self, pixels: P) -> Result<P, BoxError> {
        self(pixels)
    }
}

/// A chain of transforms that can be executed as a single transform
///
/// Transforms run in insertion order; the first failure stops the chain.
pub struct TransformChain<P> {
    transforms: Vec<Arc<dyn Transform<P>>>,
}

impl<P> TransformChain<P> {
    /// Create an empty chain, which passes images through unchanged
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Append a transform to the chain
    #[must_use]
    pub fn then(mut self, transform: impl Transform<P> + 'static) -> Self {
        self.transforms.push(Arc::new(transform));
        self
    }

    /// Append an already shared transform to the chain
    #[must_use]
    pub fn then_shared(mut self, transform: Arc<dyn Transform<P>>) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Number of transforms in the chain
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Whether the chain holds no transforms
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl<P> Default for TransformChain<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for TransformChain<P> {
    fn clone(&self) -> Self {
        Self {
            transforms: self.transforms.clone(),
        }
    }
}

impl<P> fmt::Debug for TransformChain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformChain")
            .field("len", &self.transforms.len())
            .finish()
    }
}

impl<P> Transform<P> for TransformChain<P> {
    fn apply(&self, pixels: P) -> Result<P, BoxError> {
        self.transforms
            .iter()
            .try_fold(pixels, |current, transform| transform.apply(current))
    }
}
