//! Shard planning for parallel workers
//!
//! A dataset of `N` records is split across `W` workers as consecutive
//! blocks of `ceil(N / W)` indices. Worker `i` gets the block starting at
//! `i * ceil(N / W)`, truncated to `N`. The blocks tile `[0, N)` exactly
//! once; when `W > N` the tail workers get empty shards.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Identifies one worker among a fixed number of parallel workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerTopology {
    worker_count: usize,
    worker_index: usize,
}

impl WorkerTopology {
    /// Create a topology, validating that `worker_index < worker_count`
    pub fn new(worker_count: usize, worker_index: usize) -> Result<Self> {
        if worker_count == 0 || worker_index >= worker_count {
            return Err(Error::invalid_topology(worker_count, worker_index));
        }

        Ok(Self {
            worker_count,
            worker_index,
        })
    }

    /// The topology of a lone worker
    pub fn single() -> Self {
        Self {
            worker_count: 1,
            worker_index: 0,
        }
    }

    /// Every topology of a worker count, in worker order
    pub fn all(worker_count: usize) -> Result<impl Iterator<Item = WorkerTopology>> {
        if worker_count == 0 {
            return Err(Error::invalid_topology(0, 0));
        }

        Ok((0..worker_count).map(move |worker_index| WorkerTopology {
            worker_count,
            worker_index,
        }))
    }

    /// Number of workers
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Index of this worker
    pub fn worker_index(&self) -> usize {
        self.worker_index
    }
}

/// A contiguous half-open range `[start, end)` of record indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shard {
    /// First index of the shard
    pub start: usize,

    /// One past the last index of the shard
    pub end: usize,
}

impl Shard {
    /// The shard covering `[0, total)`
    pub fn full(total: usize) -> Self {
        Self { start: 0, end: total }
    }

    /// Number of indices in the shard
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the shard holds no indices
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `index` belongs to this shard
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// The shard as a range of indices
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Shard> for Range<usize> {
    fn from(shard: Shard) -> Self {
        shard.range()
    }
}

/// Plan the shard of one worker over `total` records.
///
/// `None` means the caller is not running under worker partitioning and
/// receives the whole index space.
pub fn plan_shard(total: usize, topology: Option<WorkerTopology>) -> Shard {
    let Some(topology) = topology else {
        return Shard::full(total);
    };

    let per_worker = total.div_ceil(topology.worker_count);
    let start = topology
        .worker_index
        .checked_mul(per_worker)
        .map_or(total, |start| start.min(total));
    let end = start.saturating_add(per_worker).min(total);

    debug!(
        total,
        worker_count = topology.worker_count,
        worker_index = topology.worker_index,
        start,
        end,
        "Planned shard"
    );

    Shard { start, end }
}

/// Plan the shards of all `worker_count` workers, in worker order
pub fn plan_shards(total: usize, worker_count: usize) -> Result<Vec<Shard>> {
    Ok(WorkerTopology::all(worker_count)?
        .map(|topology| plan_shard(total, Some(topology)))
        .collect())
}
