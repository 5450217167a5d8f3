//! Git-tree-backed entries for walking committed revisions in the bare
//! cache.

use std::io::{Cursor, Read};
use std::rc::Rc;

use crate::git::GitCache;
use crate::types::Hash;
use crate::walk::{TreeEntry, WalkError};

/// An entry in a git tree.
pub struct GitEntry {
    repo: Rc<GitCache>,
    name: String,
    is_dir: bool,
    hash: Hash,
}

impl GitEntry {
    /// The root entry for a committed tree, named after the last component
    /// of the module path.
    pub fn tree(repo: Rc<GitCache>, name: impl Into<String>, hash: Hash) -> Self {
        GitEntry {
            repo,
            name: name.into(),
            is_dir: true,
            hash,
        }
    }
}

impl TreeEntry for GitEntry {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }

    fn hash(&self) -> Hash {
        self.hash
    }

    fn reader(&self) -> Result<Box<dyn Read>, WalkError> {
        let bytes = self.repo.read_blob(self.hash)?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn list(&self) -> Result<Vec<Box<dyn TreeEntry>>, WalkError> {
        let records = self.repo.tree_entries(self.hash)?;
        Ok(records
            .into_iter()
            .map(|record| {
                Box::new(GitEntry {
                    repo: Rc::clone(&self.repo),
                    name: record.name,
                    is_dir: record.is_dir,
                    hash: record.hash,
                }) as Box<dyn TreeEntry>
            })
            .collect())
    }
}
