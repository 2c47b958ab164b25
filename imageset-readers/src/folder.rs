//! Record tables built from class-per-directory image trees
//!
//! The expected layout is `root/<class name>/<any depth>/<image file>`.

use std::fs;
use std::path::{Path, PathBuf};

use imageset_core::{Record, RecordTable};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::image::ImageFormat;

/// A record table listing the images under a root directory, labeled by
/// the name of their top-level subdirectory
///
/// Classes are ordered by name and the images of a class by path, so the
/// same tree always yields the same record order. Files whose extension is
/// not a known image format are skipped.
#[derive(Debug, Clone)]
pub struct ImageFolderTable {
    root: PathBuf,
    classes: Vec<String>,
}

impl ImageFolderTable {
    /// Create a table for the tree under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            classes: Vec::new(),
        }
    }

    /// The root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Class names found by the last scan, in label order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Scan the tree and list its records
    pub fn scan(&mut self) -> Result<Vec<Record<String>>> {
        if !self.root.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "'{}' is not a directory",
                self.root.display()
            )));
        }

        let mut class_dirs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            class_dirs.push((name, entry.path()));
        }
        class_dirs.sort();

        let mut records = Vec::new();
        let mut classes = Vec::with_capacity(class_dirs.len());
        for (class, dir) in class_dirs {
            let mut images = Vec::new();
            collect_images(&dir, &mut images)?;
            images.sort();

            trace!(class = %class, images = images.len(), "Scanned class directory");
            records.extend(images.into_iter().map(|path| Record::new(path, class.clone())));
            classes.push(class);
        }

        debug!(
            root = %self.root.display(),
            classes = classes.len(),
            records = records.len(),
            "Scanned image folder"
        );
        self.classes = classes;
        Ok(records)
    }
}

impl RecordTable for ImageFolderTable {
    type Label = String;

    fn load(&mut self) -> imageset_core::Result<Vec<Record<String>>> {
        self.scan().map_err(Into::into)
    }
}

fn collect_images(dir: &Path, images: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            collect_images(&path, images)?;
        } else if file_type.is_file() && ImageFormat::from_path(&path).is_known() {
            images.push(path);
        }
    }
    Ok(())
}
