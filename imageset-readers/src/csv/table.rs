//! CSV record table implementation

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord};
use imageset_core::{Record, RecordTable};
use tracing::debug;

use crate::error::{Error, Result};

/// Options for CSV record tables
#[derive(Debug, Clone)]
pub struct CsvTableOptions {
    /// Header name of the image path column
    pub path_column: String,

    /// Header name of the class label column
    pub label_column: String,

    /// Delimiter character
    pub delimiter: u8,

    /// Whether to trim whitespace around fields
    pub trim: bool,

    /// Directory that relative image paths are resolved against
    pub base_dir: Option<PathBuf>,
}

impl Default for CsvTableOptions {
    fn default() -> Self {
        Self {
            path_column: "image_path".to_string(),
            label_column: "class".to_string(),
            delimiter: b',',
            trim: true,
            base_dir: None,
        }
    }
}

/// A record table stored as CSV with a header row
///
/// The path and label columns are looked up by name in the header once;
/// every other column is ignored. Labels are parsed with [`FromStr`], so the
/// same table can produce string class names or numeric class ids.
///
/// The underlying reader is consumed by the first [`load`](RecordTable::load).
pub struct CsvRecordTable<R, L = String> {
    reader: Option<R>,
    options: CsvTableOptions,
    _label: PhantomData<fn() -> L>,
}

impl<L> CsvRecordTable<File, L> {
    /// Open a CSV file
    pub fn open(path: impl AsRef<Path>, options: CsvTableOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Opened CSV record table");
        Ok(Self::new(file, options))
    }
}

impl<R: Read, L> CsvRecordTable<R, L> {
    /// Create a table reading CSV data from `reader`
    pub fn new(reader: R, options: CsvTableOptions) -> Self {
        Self {
            reader: Some(reader),
            options,
            _label: PhantomData,
        }
    }

    /// The table options
    pub fn options(&self) -> &CsvTableOptions {
        &self.options
    }
}

impl<R: Read, L> CsvRecordTable<R, L>
where
    L: FromStr,
    L::Err: fmt::Display,
{
    /// Read every record of the table, in row order
    pub fn read_records(&mut self) -> Result<Vec<Record<L>>> {
        let reader = self
            .reader
            .take()
            .ok_or_else(|| Error::InvalidArgument("CSV record table was already loaded".into()))?;

        let mut csv_reader = ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .has_headers(true)
            .trim(if self.options.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .from_reader(reader);

        let header = csv_reader.headers()?.clone();
        let path_idx = column_index(&header, &self.options.path_column)?;
        let label_idx = column_index(&header, &self.options.label_column)?;

        let mut records = Vec::new();
        let mut row = StringRecord::new();
        while csv_reader.read_record(&mut row)? {
            records.push(self.parse_row(&row, path_idx, label_idx)?);
        }

        debug!(
            records = records.len(),
            path_column = %self.options.path_column,
            label_column = %self.options.label_column,
            "Loaded CSV record table"
        );
        Ok(records)
    }

    fn parse_row(
        &self,
        row: &StringRecord,
        path_idx: usize,
        label_idx: usize,
    ) -> Result<Record<L>> {
        let line = row.position().map_or(0, csv::Position::line);
        let field = |idx: usize, name: &str| {
            row.get(idx)
                .ok_or_else(|| Error::Format(format!("line {line}: missing column '{name}'")))
        };

        let raw_path = field(path_idx, &self.options.path_column)?;
        if raw_path.is_empty() {
            return Err(Error::Format(format!("line {line}: empty image path")));
        }
        let path = match &self.options.base_dir {
            Some(base) => base.join(raw_path),
            None => PathBuf::from(raw_path),
        };

        let raw_label = field(label_idx, &self.options.label_column)?;
        let label = raw_label.parse().map_err(|e| {
            Error::Format(format!("line {line}: invalid label '{raw_label}': {e}"))
        })?;

        Ok(Record::new(path, label))
    }
}

impl<R: Read, L> RecordTable for CsvRecordTable<R, L>
where
    L: FromStr,
    L::Err: fmt::Display,
{
    type Label = L;

    fn load(&mut self) -> imageset_core::Result<Vec<Record<L>>> {
        self.read_records().map_err(Into::into)
    }
}

impl<R, L> fmt::Debug for CsvRecordTable<R, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvRecordTable")
            .field("options", &self.options)
            .field("loaded", &self.reader.is_none())
            .finish()
    }
}

fn column_index(header: &StringRecord, name: &str) -> Result<usize> {
    header
        .iter()
        .position(|column| column == name)
        .ok_or_else(|| Error::Schema(format!("column '{name}' not found in CSV header")))
}
