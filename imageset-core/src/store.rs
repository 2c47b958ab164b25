//! Immutable, densely indexed record storage

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::record::Record;
use crate::source::RecordTable;

/// An immutable, order-preserving store of records
///
/// Records are indexed `0..len()` in the order they were supplied. Cloning
/// the store is cheap and shares the same records, which makes it safe to
/// hand to any number of concurrent readers without locking.
#[derive(Debug)]
pub struct RecordStore<L = String> {
    records: Arc<[Record<L>]>,
}

impl<L> RecordStore<L> {
    /// Create a store from records, re-indexing them densely from zero
    pub fn new(records: impl IntoIterator<Item = Record<L>>) -> Self {
        let records: Arc<[Record<L>]> = records.into_iter().collect();
        debug!(records = records.len(), "Built record store");
        Self { records }
    }

    /// Create a store from every record of a table
    pub fn from_table<T>(table: &mut T) -> Result<Self>
    where
        T: RecordTable<Label = L> + ?Sized,
    {
        let records = table.load()?;
        Ok(Self::new(records))
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get the record at `index`
    pub fn get(&self, index: usize) -> Result<&Record<L>> {
        self.records
            .get(index)
            .ok_or_else(|| Error::out_of_range(index, self.records.len()))
    }

    /// Iterate over all records in index order
    pub fn iter(&self) -> std::slice::Iter<'_, Record<L>> {
        self.records.iter()
    }

    /// Iterate over record labels in index order
    pub fn labels(&self) -> impl Iterator<Item = &L> + '_ {
        self.records.iter().map(|r| &r.label)
    }

    /// All records as a slice
    pub fn as_slice(&self) -> &[Record<L>] {
        &self.records
    }
}

impl<L> Clone for RecordStore<L> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<L> FromIterator<Record<L>> for RecordStore<L> {
    fn from_iter<I: IntoIterator<Item = Record<L>>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a, L> IntoIterator for &'a RecordStore<L> {
    type Item = &'a Record<L>;
    type IntoIter = std::slice::Iter<'a, Record<L>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
