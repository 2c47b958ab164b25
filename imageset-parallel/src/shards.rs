//! Per-shard fan-out on the rayon thread pool

use imageset_core::{Decode, ImageDataset, ShardIter, WorkerTopology};
use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;

/// Run `f` once per worker, each time with that worker's own shard iterator
///
/// The calls run in parallel on the rayon thread pool. Results are
/// returned in worker order, whatever order the workers finished in.
pub fn map_shards<D, L, T, F>(
    dataset: &ImageDataset<D, L>,
    worker_count: usize,
    f: F,
) -> Result<Vec<T>>
where
    D: Decode,
    L: Clone + Send + Sync,
    T: Send,
    F: Fn(ShardIter<D, L>) -> T + Send + Sync,
{
    let topologies: Vec<WorkerTopology> = WorkerTopology::all(worker_count)?.collect();
    debug!(worker_count, records = dataset.len(), "Mapping over shards");

    Ok(topologies
        .into_par_iter()
        .map(|topology| f(dataset.iter_shard(Some(topology))))
        .collect())
}

/// Count the successfully materialized samples of every worker's shard
pub fn count_samples<D, L>(dataset: &ImageDataset<D, L>, worker_count: usize) -> Result<Vec<usize>>
where
    D: Decode,
    L: Clone + Send + Sync,
{
    map_shards(dataset, worker_count, |iter| {
        iter.filter(std::result::Result::is_ok).count()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageset_core::{BoxError, Record, RecordStore};
    use std::path::Path;
    use test_case::test_case;

    fn decode_len(path: &Path) -> std::result::Result<usize, BoxError> {
        match path.to_str() {
            Some("missing") => Err("no such file".into()),
            Some(s) => Ok(s.len()),
            None => Err("non utf-8 path".into()),
        }
    }

    fn dataset(n: usize) -> ImageDataset<impl Decode<Pixels = usize>, usize> {
        ImageDataset::new(
            RecordStore::new((0..n).map(|i| Record::new(format!("{i}"), i))),
            decode_len,
        )
    }

    #[test_case(10, 3, &[4, 4, 2] ; "ten records three workers")]
    #[test_case(5, 8, &[1, 1, 1, 1, 1, 0, 0, 0] ; "more workers than records")]
    #[test_case(3, 1, &[3] ; "single worker")]
    fn test_count_samples_per_worker(n: usize, workers: usize, expected: &[usize]) {
        assert_eq!(count_samples(&dataset(n), workers).unwrap(), expected);
    }

    #[test]
    fn test_map_shards_in_worker_order() {
        let ds = dataset(7);
        let firsts = map_shards(&ds, 3, |iter| iter.shard().start).unwrap();
        assert_eq!(firsts, vec![0, 3, 6]);

        let labels = map_shards(&ds, 2, |iter| {
            iter.map(|s| s.unwrap().label).collect::<Vec<_>>()
        })
        .unwrap();
        assert_eq!(labels, vec![vec![0, 1, 2, 3], vec![4, 5, 6]]);
    }

    #[test]
    fn test_failures_are_not_counted() {
        let records = vec![
            Record::new("a", 0),
            Record::new("missing", 1),
            Record::new("c", 2),
        ];
        let ds = ImageDataset::new(RecordStore::new(records), decode_len);
        assert_eq!(count_samples(&ds, 2).unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_zero_workers_is_an_error() {
        assert!(map_shards(&dataset(3), 0, |iter| iter.count()).is_err());
    }
}
