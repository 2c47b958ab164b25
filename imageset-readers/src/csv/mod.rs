//! CSV record tables
//!
//! Loads `(image path, class label)` records from a delimited file with a
//! header row, such as the tables exported by annotation tools.

mod table;

pub use table::{CsvRecordTable, CsvTableOptions};
