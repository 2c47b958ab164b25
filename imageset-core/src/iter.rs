//! Lazy, single-pass iteration over one worker's shard

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::materialize::{Decode, Materializer};
use crate::record::Sample;
use crate::shard::{plan_shard, Shard, WorkerTopology};
use crate::store::RecordStore;

/// A lazy sequence of samples over one shard of a dataset
///
/// The shard is planned when the iterator is created, from the store length
/// and the worker topology passed in. Records are then decoded one at a
/// time, in increasing index order, only when the consumer pulls the next
/// item; at most one decoded sample exists at any point inside the
/// iterator.
///
/// The iterator is single pass: once exhausted it stays exhausted and there
/// is no way to rewind it. A new pass starts with a new call to
/// [`ImageDataset::iter_shard`](crate::ImageDataset::iter_shard), which
/// plans the shard again.
///
/// A sample that fails to decode or transform is yielded as `Err`; the
/// iterator still advances past it, so the next pull continues with the
/// following record.
pub struct ShardIter<D: Decode, L = String> {
    store: RecordStore<L>,
    materializer: Arc<Materializer<D>>,
    shard: Shard,
    position: usize,
}

impl<D: Decode, L: Clone> ShardIter<D, L> {
    pub(crate) fn new(
        store: RecordStore<L>,
        materializer: Arc<Materializer<D>>,
        topology: Option<WorkerTopology>,
    ) -> Self {
        let shard = plan_shard(store.len(), topology);
        debug!(
            worker_index = topology.map(|t| t.worker_index()),
            start = shard.start,
            end = shard.end,
            "Starting shard iteration"
        );

        Self {
            store,
            materializer,
            position: shard.start,
            shard,
        }
    }

    /// The shard this iterator covers
    pub fn shard(&self) -> Shard {
        self.shard
    }

    /// Index of the record the next pull will produce
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of samples left to pull
    pub fn remaining(&self) -> usize {
        self.shard.end - self.position
    }

    /// Whether another sample can be pulled
    pub fn has_next(&self) -> bool {
        self.position < self.shard.end
    }

    /// Pull the next sample together with its record index
    pub fn next_indexed(&mut self) -> Option<(usize, Result<Sample<D::Pixels, L>>)> {
        if !self.has_next() {
            return None;
        }

        let index = self.position;
        self.position += 1;

        let result = self
            .store
            .get(index)
            .and_then(|record| self.materializer.materialize(record));

        if !self.has_next() {
            debug!(end = self.shard.end, "Shard exhausted");
        }

        Some((index, result))
    }

    /// Turn into an iterator that also yields the record index of each sample
    pub fn indexed(self) -> Indexed<D, L> {
        Indexed { inner: self }
    }
}

impl<D: Decode, L: Clone> Iterator for ShardIter<D, L> {
    type Item = Result<Sample<D::Pixels, L>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_indexed().map(|(_, result)| result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl<D: Decode, L: Clone> ExactSizeIterator for ShardIter<D, L> {}

impl<D: Decode, L: Clone> FusedIterator for ShardIter<D, L> {}

impl<D: Decode, L> fmt::Debug for ShardIter<D, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardIter")
            .field("shard", &self.shard)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// Iterator over `(index, sample)` pairs of one shard
///
/// Created by [`ShardIter::indexed`].
#[derive(Debug)]
pub struct Indexed<D: Decode, L = String> {
    inner: ShardIter<D, L>,
}

impl<D: Decode, L: Clone> Indexed<D, L> {
    /// The shard being iterated
    pub fn shard(&self) -> Shard {
        self.inner.shard()
    }
}

impl<D: Decode, L: Clone> Iterator for Indexed<D, L> {
    type Item = (usize, Result<Sample<D::Pixels, L>>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next_indexed()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<D: Decode, L: Clone> ExactSizeIterator for Indexed<D, L> {}

impl<D: Decode, L: Clone> FusedIterator for Indexed<D, L> {}
