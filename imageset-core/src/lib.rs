//! Core record store, shard planning and lazy sample iteration for image datasets
//!
//! A dataset is a fixed, ordered table of `(path, label)` records. This
//! crate exposes it in two ways that share one immutable
//! [`RecordStore`]:
//!
//! * as an indexable dataset whose [`ImageDataset::get`] decodes and
//!   transforms a single record on demand;
//! * as a set of lazy [`ShardIter`]s, one per worker, that split the records
//!   into contiguous blocks with no overlap and no gap and decode them one at
//!   a time as they are pulled.
//!
//! Decoding and transforming are injected through the [`Decode`] and
//! [`Transform`] traits, which are implemented for plain closures.

#![warn(missing_docs)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod iter;
pub mod materialize;
pub mod record;
pub mod shard;
pub mod source;
pub mod store;
pub mod transform;

// Re-export key types for convenience
pub use config::LoaderConfig;
pub use dataset::{DatasetBuilder, ImageDataset};
pub use error::{BoxError, Error, Result};
pub use iter::{Indexed, ShardIter};
pub use materialize::{Decode, Materializer};
pub use record::{Record, Sample};
pub use shard::{plan_shard, plan_shards, Shard, WorkerTopology};
pub use source::RecordTable;
pub use store::RecordStore;
pub use transform::{Transform, TransformChain};
