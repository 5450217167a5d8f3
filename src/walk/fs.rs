//! Filesystem-backed tree entries for walking the working copy.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::types::{Hash, NO_HASH};
use crate::walk::{TreeEntry, WalkError};

/// An entry in a directory on disk.
pub struct FsEntry {
    path: PathBuf,
    is_dir: bool,
}

impl FsEntry {
    pub fn dir(path: impl Into<PathBuf>) -> Self {
        FsEntry {
            path: path.into(),
            is_dir: true,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        FsEntry {
            path: path.into(),
            is_dir: false,
        }
    }
}

impl TreeEntry for FsEntry {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// The working copy has no object hashes.
    fn hash(&self) -> Hash {
        NO_HASH
    }

    fn reader(&self) -> Result<Box<dyn Read>, WalkError> {
        Ok(Box::new(File::open(&self.path)?))
    }

    fn list(&self) -> Result<Vec<Box<dyn TreeEntry>>, WalkError> {
        let mut entries: Vec<Box<dyn TreeEntry>> = Vec::new();
        let mut names: Vec<(String, PathBuf, bool)> = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            names.push((
                entry.file_name().to_string_lossy().into_owned(),
                entry.path(),
                file_type.is_dir(),
            ));
        }
        // Directory order is filesystem-dependent; sort for determinism.
        names.sort();
        for (_, path, is_dir) in names {
            entries.push(Box::new(FsEntry { path, is_dir }));
        }
        Ok(entries)
    }
}
