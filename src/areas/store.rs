use crate::areas::lockfile::Lockfile;
use crate::artifacts::core::Result;
use crate::artifacts::graph_index::{BloomIndex, EncodeSummary, Encoder, FileIndex, OpenOptions};
use std::cell::{RefCell, RefMut};
use std::fs::File;
use std::path::Path;

/// An index file on disk plus the output commands report to
pub struct IndexStore {
    path: Box<Path>,
    writer: RefCell<Box<dyn std::io::Write>>,
    options: OpenOptions,
}

impl IndexStore {
    pub fn new(path: &Path, writer: Box<dyn std::io::Write>) -> Self {
        IndexStore {
            path: path.to_path_buf().into_boxed_path(),
            writer: RefCell::new(writer),
            options: OpenOptions::default(),
        }
    }

    pub fn with_options(self, options: OpenOptions) -> Self {
        IndexStore { options, ..self }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn open(&self) -> Result<FileIndex<File>> {
        self.options.open_path(&self.path)
    }

    /// Encode `index` and atomically replace the file on disk
    pub fn write_index<I: BloomIndex + ?Sized>(
        &self,
        index: &I,
        encoder: &Encoder,
    ) -> Result<EncodeSummary> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        Lockfile::new(&self.path).publish(|file| encoder.encode(index, file))
    }
}
