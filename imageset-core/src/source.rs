//! Record table trait for loading dataset records

use crate::error::Result;
use crate::record::Record;

/// A table of labeled records that a dataset is built from
///
/// Implementations read whatever external representation holds the
/// `(path, label)` pairs (a CSV file, a directory tree, a database query)
/// and return them in table order. The order is preserved by the
/// [`RecordStore`](crate::RecordStore), which re-indexes it densely.
pub trait RecordTable {
    /// The label type of the produced records
    type Label;

    /// Load all records in table order
    fn load(&mut self) -> Result<Vec<Record<Self::Label>>>;
}

impl<L: Clone> RecordTable for Vec<Record<L>> {
    type Label = L;

    fn load(&mut self) -> Result<Vec<Record<L>>> {
        Ok(self.clone())
    }
}

impl<L: Clone> RecordTable for &[Record<L>] {
    type Label = L;

    fn load(&mut self) -> Result<Vec<Record<L>>> {
        Ok(self.to_vec())
    }
}
