//! Image dataset with random access and sharded lazy iteration

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::iter::ShardIter;
use crate::materialize::{Decode, Materializer};
use crate::record::{Record, Sample};
use crate::shard::WorkerTopology;
use crate::source::RecordTable;
use crate::store::RecordStore;
use crate::transform::Transform;

/// A labeled image dataset backed by one immutable record store
///
/// The same store serves two access modes:
///
/// * random access: [`len`](Self::len), [`record`](Self::record) for the raw
///   record and [`get`](Self::get), which decodes and transforms
///   synchronously;
/// * sharded iteration: [`iter_shard`](Self::iter_shard) returns a lazy
///   [`ShardIter`] over the part of the dataset assigned to one worker.
///
/// Cloning a dataset is cheap; clones share the store and the decoder.
pub struct ImageDataset<D: Decode, L = String> {
    store: RecordStore<L>,
    materializer: Arc<Materializer<D>>,
}

impl<D: Decode, L> ImageDataset<D, L> {
    /// Create a dataset that decodes records without transforming them
    pub fn new(store: RecordStore<L>, decoder: D) -> Self {
        Self::from_parts(store, Arc::new(Materializer::new(decoder)))
    }

    /// Create a dataset from a store and a shared materializer
    pub fn from_parts(store: RecordStore<L>, materializer: Arc<Materializer<D>>) -> Self {
        Self {
            store,
            materializer,
        }
    }

    /// Start building a dataset around a decoder
    pub fn builder(decoder: D) -> DatasetBuilder<D, L> {
        DatasetBuilder::new(decoder)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the dataset holds no records
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The underlying record store
    pub fn store(&self) -> &RecordStore<L> {
        &self.store
    }

    /// The materializer used to produce samples
    pub fn materializer(&self) -> &Arc<Materializer<D>> {
        &self.materializer
    }

    /// The raw, undecoded record at `index`
    pub fn record(&self, index: usize) -> Result<&Record<L>> {
        self.store.get(index)
    }
}

impl<D: Decode, L: Clone> ImageDataset<D, L> {
    /// Decode and transform the record at `index`
    ///
    /// Each call is independent: nothing is cached, and concurrent calls
    /// from several threads are allowed.
    pub fn get(&self, index: usize) -> Result<Sample<D::Pixels, L>> {
        let record = self.store.get(index)?;
        self.materializer.materialize(record)
    }

    /// Lazily iterate over the shard of one worker
    ///
    /// `None` means no worker partitioning: the iterator covers the whole
    /// dataset. The shard is planned on every call.
    pub fn iter_shard(&self, topology: Option<WorkerTopology>) -> ShardIter<D, L> {
        ShardIter::new(self.store.clone(), Arc::clone(&self.materializer), topology)
    }

    /// Lazily iterate over the whole dataset
    pub fn iter(&self) -> ShardIter<D, L> {
        self.iter_shard(None)
    }

    /// One iterator per worker for `worker_count` workers, in worker order
    pub fn worker_iters(&self, worker_count: usize) -> Result<Vec<ShardIter<D, L>>> {
        Ok(WorkerTopology::all(worker_count)?
            .map(|topology| self.iter_shard(Some(topology)))
            .collect())
    }
}

impl<D: Decode, L> Clone for ImageDataset<D, L> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            materializer: Arc::clone(&self.materializer),
        }
    }
}

impl<D: Decode, L> fmt::Debug for ImageDataset<D, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageDataset")
            .field("len", &self.store.len())
            .field("materializer", &self.materializer)
            .finish()
    }
}

/// A builder for creating image datasets
pub struct DatasetBuilder<D: Decode, L = String> {
    /// The decode backend
    decoder: D,

    /// Records supplied directly
    store: Option<RecordStore<L>>,

    /// Table to load records from when no store is supplied
    table: Option<Box<dyn RecordTable<Label = L>>>,

    /// Transform applied after decoding
    transform: Option<Arc<dyn Transform<D::Pixels>>>,
}

impl<D: Decode, L> DatasetBuilder<D, L> {
    /// Create a new dataset builder
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            store: None,
            table: None,
            transform: None,
        }
    }

    /// Use these records, in order
    #[must_use]
    pub fn records(self, records: impl IntoIterator<Item = Record<L>>) -> Self {
        self.store(RecordStore::new(records))
    }

    /// Use an existing record store
    #[must_use]
    pub fn store(mut self, store: RecordStore<L>) -> Self {
        self.store = Some(store);
        self
    }

    /// Load records from a table when the dataset is built
    #[must_use]
    pub fn table(mut self, table: impl RecordTable<Label = L> + 'static) -> Self {
        self.table = Some(Box::new(table));
        self
    }

    /// Apply a transform to every decoded image
    #[must_use]
    pub fn transform(mut self, transform: impl Transform<D::Pixels> + 'static) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Apply an already shared transform to every decoded image
    #[must_use]
    pub fn shared_transform(mut self, transform: Arc<dyn Transform<D::Pixels>>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Build the dataset
    pub fn build(self) -> Result<ImageDataset<D, L>> {
        let store = match (self.store, self.table) {
            (Some(store), _) => store,
            (None, Some(mut table)) => RecordStore::from_table(table.as_mut())?,
            (None, None) => {
                return Err(Error::InvalidArgument(
                    "Records or a record table are required to build a dataset".into(),
                ))
            }
        };

        let materializer = match self.transform {
            Some(transform) => Materializer::with_transform(self.decoder, transform),
            None => Materializer::new(self.decoder),
        };

        debug!(
            records = store.len(),
            transform = materializer.has_transform(),
            "Built image dataset"
        );

        Ok(ImageDataset::from_parts(store, Arc::new(materializer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use std::collections::BTreeSet;
    use std::path::Path;
    use test_case::test_case;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .try_init();
    }

    type Pixels = Vec<u8>;

    /// Decodes `img_<n>.png` into `[n]`; fails for names containing "corrupt"
    fn decode_index(path: &Path) -> std::result::Result<Pixels, BoxError> {
        let name = path.to_string_lossy();
        if name.contains("corrupt") {
            return Err("corrupt image data".into());
        }
        let n: u8 = name
            .trim_start_matches("img_")
            .trim_end_matches(".png")
            .parse()?;
        Ok(vec![n])
    }

    fn dataset(n: usize) -> ImageDataset<impl Decode<Pixels = Pixels>, u32> {
        let records = (0..n).map(|i| Record::new(format!("img_{i}.png"), i as u32 * 10));
        ImageDataset::new(RecordStore::new(records), decode_index)
    }

    #[test]
    fn test_single_worker_yields_all_in_order() {
        let samples: Vec<_> = dataset(3).iter().map(|s| s.unwrap()).collect();
        let pixels: Vec<_> = samples.iter().map(|s| s.pixels[0]).collect();
        assert_eq!(pixels, vec![0, 1, 2]);
        assert_eq!(samples.iter().map(|s| s.label).collect::<Vec<_>>(), vec![0, 10, 20]);
    }

    #[test]
    fn test_get_out_of_range() {
        let ds = dataset(3);
        assert!(matches!(ds.get(3), Err(Error::OutOfRange { index: 3, len: 3 })));
        assert!(matches!(ds.record(3), Err(Error::OutOfRange { .. })));
        assert!(matches!(ds.get(usize::MAX), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn test_record_is_raw() {
        let ds = dataset(2);
        let record = ds.record(1).unwrap();
        assert_eq!(record.path(), Path::new("img_1.png"));
        assert_eq!(record.label, 10);
    }

    #[test_case(10, 3 ; "ten records three workers")]
    #[test_case(5, 8 ; "more workers than records")]
    #[test_case(0, 2 ; "empty dataset")]
    #[test_case(17, 1 ; "single worker")]
    fn test_workers_cover_dataset_exactly_once(n: usize, workers: usize) {
        let ds = dataset(n);
        let mut seen = Vec::new();
        for iter in ds.worker_iters(workers).unwrap() {
            for (index, sample) in iter.indexed() {
                let sample = sample.unwrap();
                assert_eq!(sample.label, ds.record(index).unwrap().label);
                seen.push(index);
            }
        }
        assert_eq!(seen.len(), n);
        assert_eq!(seen.iter().copied().collect::<BTreeSet<_>>().len(), n);
    }

    #[test]
    fn test_random_access_matches_iteration() {
        let ds = dataset(10);
        for iter in ds.worker_iters(4).unwrap() {
            for (index, sample) in iter.indexed() {
                assert_eq!(sample.unwrap(), ds.get(index).unwrap());
            }
        }
    }

    #[test]
    fn test_decode_failure_is_isolated() {
        init_tracing();
        let records = vec![
            Record::new("img_0.png", 0),
            Record::new("corrupt.png", 1),
            Record::new("img_2.png", 2),
        ];
        let ds = ImageDataset::new(RecordStore::new(records), decode_index);

        let mut iter = ds.iter();
        assert!(iter.next().unwrap().is_ok());
        let err = iter.next().unwrap().unwrap_err();
        assert!(err.is_sample_error());
        assert_eq!(iter.position(), 2);
        let next = iter.next().unwrap().unwrap();
        assert_eq!(next.pixels, vec![2]);
        assert!(iter.next().is_none());

        // Random access is just as unaffected.
        assert!(ds.get(1).is_err());
        assert!(ds.get(2).is_ok());
    }

    #[test]
    fn test_iterator_is_single_pass() {
        let ds = dataset(4);
        let mut iter = ds.iter_shard(Some(WorkerTopology::new(2, 1).unwrap()));
        assert_eq!(iter.shard().range(), 2..4);
        assert_eq!(iter.len(), 2);
        assert!(iter.has_next());
        assert_eq!(iter.by_ref().count(), 2);
        assert!(!iter.has_next());
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());

        // A fresh call plans the shard again and starts from its beginning.
        let again = ds.iter_shard(Some(WorkerTopology::new(2, 1).unwrap()));
        assert_eq!(again.position(), 2);
    }

    #[test]
    fn test_iterators_are_lazy() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static DECODED: AtomicUsize = AtomicUsize::new(0);
        let counting = |path: &Path| -> std::result::Result<Pixels, BoxError> {
            DECODED.fetch_add(1, Ordering::SeqCst);
            Ok(path.to_string_lossy().into_owned().into_bytes())
        };
        let ds = ImageDataset::new(RecordStore::new(vec![Record::new("a", 0u8); 5]), counting);

        let mut iter = ds.iter();
        assert_eq!(DECODED.load(Ordering::SeqCst), 0);
        iter.next();
        iter.next();
        assert_eq!(DECODED.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_builder_with_transform() {
        let invert = |p: Pixels| -> std::result::Result<Pixels, BoxError> {
            Ok(p.into_iter().map(|v| 255 - v).collect())
        };
        let ds = ImageDataset::builder(decode_index)
            .records(vec![Record::new("img_5.png", "cat".to_string())])
            .transform(invert)
            .build()
            .unwrap();
        let sample = ds.get(0).unwrap();
        assert_eq!(sample.pixels, vec![250]);
        assert_eq!(sample.label, "cat");
    }

    #[test]
    fn test_builder_loads_table() {
        let table = vec![Record::new("img_1.png", 'a'), Record::new("img_2.png", 'b')];
        let ds = ImageDataset::builder(decode_index)
            .table(table)
            .build()
            .unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).unwrap().label, 'b');
    }

    #[test]
    fn test_builder_requires_records() {
        let result = ImageDataset::<_, String>::builder(decode_index).build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_concurrent_random_access() {
        let ds = dataset(64);
        std::thread::scope(|scope| {
            for t in 0..4 {
                let ds = &ds;
                scope.spawn(move || {
                    for i in (t..64).step_by(4) {
                        assert_eq!(ds.get(i).unwrap().pixels, vec![i as u8]);
                    }
                });
            }
        });
    }
}
