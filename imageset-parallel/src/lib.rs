//! Multi-worker drivers for sharded imageset iteration
//!
//! Both drivers give every worker its own [`ShardIter`](imageset_core::ShardIter)
//! over a shared, read-only [`ImageDataset`](imageset_core::ImageDataset):
//!
//! * [`ParallelLoader`] runs one thread per worker and merges their samples
//!   into a single bounded queue for a consumer;
//! * [`map_shards`] runs a function over every worker's shard on the rayon
//!   thread pool.

mod error;
pub mod loader;
pub mod shards;

pub use error::{Error, Result};
pub use loader::{LoaderHandle, ParallelLoader, WorkerSample, WorkerStats};
pub use shards::{count_samples, map_shards};
