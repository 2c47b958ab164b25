//! Thread-per-worker loader feeding a bounded queue

use std::fmt;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use imageset_core::{
    Decode, ImageDataset, LoaderConfig, Sample, Shard, ShardIter, WorkerTopology,
};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// A sample produced by one worker, tagged with where it came from
#[derive(Debug)]
pub struct WorkerSample<P, L = String> {
    /// Index of the worker that produced the sample
    pub worker_index: usize,

    /// Record index of the sample
    pub index: usize,

    /// The sample, or the error that prevented producing it
    pub result: imageset_core::Result<Sample<P, L>>,
}

/// What one worker did before it stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    /// Index of the worker
    pub worker_index: usize,

    /// Shard assigned to the worker
    pub shard: Shard,

    /// Samples delivered successfully
    pub produced: usize,

    /// Failed samples delivered as errors
    pub failed: usize,

    /// Whether the worker stopped because the consumer went away
    pub cancelled: bool,
}

/// Drives one lazy shard iterator per worker, each on its own thread
///
/// Every worker owns exactly one [`ShardIter`] and shares nothing with the
/// others but the read-only dataset. Samples are merged into one bounded
/// queue of `prefetch` entries; each worker may hold one more sample while
/// it waits for room, so at most `prefetch + num_workers` decoded samples
/// wait for the consumer. Samples of one worker arrive in index order; the
/// interleaving between workers is unspecified.
///
/// When the configuration names a `worker_index`, this process is a single
/// worker of `num_workers`: only that worker's shard is loaded, on one
/// thread.
pub struct ParallelLoader<D: Decode, L = String> {
    dataset: ImageDataset<D, L>,
    config: LoaderConfig,
}

impl<D, L> ParallelLoader<D, L>
where
    D: Decode + 'static,
    D::Pixels: Send + 'static,
    L: Clone + Send + Sync + 'static,
{
    /// Create a loader for `dataset`
    pub fn new(dataset: ImageDataset<D, L>, config: LoaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { dataset, config })
    }

    /// The loader configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Start the workers
    ///
    /// Each call plans the shards again and starts a fresh pass over the
    /// dataset.
    pub fn spawn(&self) -> Result<LoaderHandle<D::Pixels, L>> {
        let topologies: Vec<WorkerTopology> = match self.config.topology()? {
            Some(topology) => vec![topology],
            None => WorkerTopology::all(self.config.num_workers)?.collect(),
        };

        let (sender, receiver) = channel::bounded(self.config.prefetch);
        let mut handle = LoaderHandle {
            receiver: Some(receiver),
            workers: Vec::with_capacity(topologies.len()),
        };

        for topology in topologies {
            let worker_index = topology.worker_index();
            let iter = self.dataset.iter_shard(Some(topology));
            let sender = sender.clone();

            let join = thread::Builder::new()
                .name(format!("imageset-worker-{worker_index}"))
                .spawn(move || run_worker(worker_index, iter, &sender))
                .map_err(|source| Error::Spawn {
                    worker_index,
                    source,
                })?;
            handle.workers.push((worker_index, join));
        }

        info!(
            workers = handle.workers.len(),
            worker_count = self.config.num_workers,
            prefetch = self.config.prefetch,
            records = self.dataset.len(),
            "Started parallel loader"
        );
        Ok(handle)
    }
}

impl<D: Decode, L> fmt::Debug for ParallelLoader<D, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelLoader")
            .field("dataset", &self.dataset)
            .field("config", &self.config)
            .finish()
    }
}

fn run_worker<D, L>(
    worker_index: usize,
    iter: ShardIter<D, L>,
    sender: &Sender<WorkerSample<D::Pixels, L>>,
) -> WorkerStats
where
    D: Decode,
    L: Clone,
{
    let mut stats = WorkerStats {
        worker_index,
        shard: iter.shard(),
        produced: 0,
        failed: 0,
        cancelled: false,
    };

    for (index, result) in iter.indexed() {
        let ok = result.is_ok();
        let sample = WorkerSample {
            worker_index,
            index,
            result,
        };

        if sender.send(sample).is_err() {
            debug!(worker_index, index, "Consumer went away, stopping worker");
            stats.cancelled = true;
            break;
        }

        if ok {
            stats.produced += 1;
        } else {
            stats.failed += 1;
        }
    }

    debug!(
        worker_index,
        produced = stats.produced,
        failed = stats.failed,
        "Worker finished"
    );
    stats
}

/// Receiving end of a running [`ParallelLoader`]
///
/// Iterating yields samples until every worker has finished its shard.
/// Dropping the handle, or calling [`join`](Self::join) early, cancels the
/// workers: each stops at its next attempt to queue a sample.
pub struct LoaderHandle<P, L = String> {
    receiver: Option<Receiver<WorkerSample<P, L>>>,
    workers: Vec<(usize, JoinHandle<WorkerStats>)>,
}

impl<P, L> LoaderHandle<P, L> {
    /// Stop receiving, wait for all workers and collect their statistics
    pub fn join(mut self) -> Result<Vec<WorkerStats>> {
        // Closing the queue unblocks workers waiting to send.
        self.receiver = None;

        let mut stats = Vec::with_capacity(self.workers.len());
        for (worker_index, join) in std::mem::take(&mut self.workers) {
            match join.join() {
                Ok(worker_stats) => stats.push(worker_stats),
                Err(_) => {
                    warn!(worker_index, "Worker panicked");
                    return Err(Error::WorkerPanicked { worker_index });
                }
            }
        }

        info!(workers = stats.len(), "Parallel loader finished");
        Ok(stats)
    }
}

impl<P, L> Iterator for LoaderHandle<P, L> {
    type Item = WorkerSample<P, L>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.as_ref()?.recv().ok()
    }
}

impl<P, L> Drop for LoaderHandle<P, L> {
    fn drop(&mut self) {
        self.receiver = None;
        for (_, join) in self.workers.drain(..) {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageset_core::{BoxError, Record, RecordStore};
    use std::collections::BTreeSet;
    use std::ops::Range;
    use std::path::Path;
    use test_case::test_case;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .try_init();
    }

    fn decode_name(path: &Path) -> std::result::Result<String, BoxError> {
        let name = path.to_string_lossy().into_owned();
        if name.starts_with("bad") {
            return Err("unreadable".into());
        }
        if name.starts_with("panic") {
            panic!("decoder bug");
        }
        Ok(name)
    }

    fn dataset(names: Vec<String>) -> ImageDataset<impl Decode<Pixels = String>, usize> {
        let records = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Record::new(name, i));
        ImageDataset::new(RecordStore::new(records), decode_name)
    }

    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("img_{i}.png")).collect()
    }

    #[test_case(10, 3, 2 ; "ten records three workers")]
    #[test_case(5, 8, 1 ; "more workers than records")]
    #[test_case(0, 2, 4 ; "empty dataset")]
    #[test_case(100, 4, 8 ; "hundred records")]
    fn test_loader_delivers_every_record_once(n: usize, workers: usize, prefetch: usize) {
        let config = LoaderConfig {
            num_workers: workers,
            prefetch,
            worker_index: None,
        };
        let loader = ParallelLoader::new(dataset(numbered(n)), config).unwrap();
        let mut handle = loader.spawn().unwrap();

        let mut seen = BTreeSet::new();
        let mut last_per_worker = vec![None; workers];
        for sample in handle.by_ref() {
            let value = sample.result.unwrap();
            assert_eq!(value.label, sample.index);
            assert_eq!(value.pixels, format!("img_{}.png", sample.index));
            assert!(seen.insert(sample.index));

            // Within one worker samples arrive in index order.
            let last = &mut last_per_worker[sample.worker_index];
            assert!(last.map_or(true, |l| l < sample.index));
            *last = Some(sample.index);
        }
        assert_eq!(seen.len(), n);

        let stats = handle.join().unwrap();
        assert_eq!(stats.len(), workers);
        assert_eq!(stats.iter().map(|s| s.produced).sum::<usize>(), n);
        assert!(stats.iter().all(|s| !s.cancelled && s.failed == 0));
    }

    #[test]
    fn test_failed_sample_is_delivered_as_error() {
        init_tracing();
        let names = vec!["a.png".to_string(), "bad.png".to_string(), "c.png".to_string()];
        let config = LoaderConfig::with_workers(1);
        let handle = ParallelLoader::new(dataset(names), config).unwrap().spawn().unwrap();

        let results: Vec<_> = handle.map(|s| (s.index, s.result.is_ok())).collect();
        assert_eq!(results, vec![(0, true), (1, false), (2, true)]);
    }

    #[test]
    fn test_dropping_receiver_cancels_workers() {
        let config = LoaderConfig {
            num_workers: 2,
            prefetch: 1,
            worker_index: None,
        };
        let loader = ParallelLoader::new(dataset(numbered(1_000)), config).unwrap();
        let mut handle = loader.spawn().unwrap();

        let taken: Vec<_> = handle.by_ref().take(3).collect();
        assert_eq!(taken.len(), 3);

        let stats = handle.join().unwrap();
        assert!(stats.iter().all(|s| s.cancelled));
        assert!(stats.iter().map(|s| s.produced).sum::<usize>() < 1_000);
    }

    #[test]
    fn test_worker_panic_is_reported() {
        init_tracing();
        let names = vec!["ok.png".to_string(), "panic.png".to_string()];
        let loader = ParallelLoader::new(dataset(names), LoaderConfig::with_workers(2)).unwrap();
        let mut handle = loader.spawn().unwrap();
        for _ in handle.by_ref() {}

        assert!(matches!(handle.join(), Err(Error::WorkerPanicked { worker_index: 1 })));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = LoaderConfig {
            num_workers: 0,
            prefetch: 1,
            worker_index: None,
        };
        let err = ParallelLoader::new(dataset(numbered(3)), config).unwrap_err();
        assert!(matches!(err, Error::Core(imageset_core::Error::Config(_))));
    }

    #[test]
    fn test_loader_is_debug() {
        let loader =
            ParallelLoader::new(dataset(numbered(2)), LoaderConfig::with_workers(2)).unwrap();
        let text = format!("{loader:?}");
        assert!(text.starts_with("ParallelLoader"));
        assert!(text.contains("num_workers: 2"));
    }

    #[test_case(0, 0..3 ; "first worker")]
    #[test_case(1, 3..6 ; "middle worker")]
    #[test_case(2, 6..9 ; "last worker")]
    fn test_configured_worker_loads_only_its_shard(worker: usize, expected: Range<usize>) {
        let config = LoaderConfig {
            num_workers: 3,
            prefetch: 4,
            worker_index: Some(worker),
        };
        let loader = ParallelLoader::new(dataset(numbered(9)), config).unwrap();
        let mut handle = loader.spawn().unwrap();

        let indices: Vec<_> = handle
            .by_ref()
            .map(|sample| {
                assert_eq!(sample.worker_index, worker);
                sample.index
            })
            .collect();
        assert_eq!(indices, expected.clone().collect::<Vec<_>>());

        let stats = handle.join().unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].shard.range(), expected);
        assert_eq!(stats[0].produced, 3);
    }

    #[test]
    fn test_each_spawn_is_a_fresh_pass() {
        let loader =
            ParallelLoader::new(dataset(numbered(6)), LoaderConfig::with_workers(2)).unwrap();
        for _ in 0..2 {
            assert_eq!(loader.spawn().unwrap().count(), 6);
        }
    }
}
