//! Depth-first traversal over directory trees.
//!
//! The same walker serves the working copy on disk and the committed trees
//! of dependencies in the bare git cache, so the package analyzer reads
//! both through one interface.

pub mod fs;
pub mod git;

use std::io::Read;

use thiserror::Error;

use crate::types::Hash;

pub use fs::FsEntry;
pub use git::GitEntry;

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git(#[from] crate::git::GitError),
}

/// An entry in a directory, regardless of whether it comes from the file
/// system or a git tree.
pub trait TreeEntry {
    fn name(&self) -> String;
    fn is_dir(&self) -> bool;
    /// The git object hash, or `NO_HASH` for filesystem entries.
    fn hash(&self) -> Hash;
    /// Open a file entry for reading.
    fn reader(&self) -> Result<Box<dyn Read>, WalkError>;
    /// The children of a directory entry.
    fn list(&self) -> Result<Vec<Box<dyn TreeEntry>>, WalkError>;
}

/// Depth-first iteration over a tree, with the option to skip the
/// descendants of the most recently yielded directory.
pub struct Walker {
    stack: Vec<Frame>,
}

struct Frame {
    prefix: String,
    entries: Vec<Box<dyn TreeEntry>>,
    index: usize,
}

/// Start a walk at the given entry. `dir` is the path of the directory
/// containing the entry.
pub fn walk(dir: &str, entry: Box<dyn TreeEntry>) -> Walker {
    Walker {
        stack: vec![Frame {
            prefix: format!("{dir}/"),
            entries: vec![entry],
            index: 0,
        }],
    }
}

impl Walker {
    /// Advance to the next entry and return it with its full path, or
    /// `None` at the end of the traversal.
    pub fn next(&mut self) -> Result<Option<(String, &dyn TreeEntry)>, WalkError> {
        loop {
            let top = match self.stack.last_mut() {
                Some(top) => top,
                None => return Ok(None),
            };
            if top.index >= top.entries.len() {
                self.stack.pop();
                continue;
            }
            let index = top.index;
            top.index += 1;
            let prefix = top.prefix.clone();

            // A borrow dance: push the child frame before re-borrowing the
            // yielded entry from its owning frame.
            let (path, push) = {
                let entry = &top.entries[index];
                let path = format!("{prefix}{}", entry.name());
                let push = if entry.is_dir() {
                    Some(Frame {
                        prefix: format!("{path}/"),
                        entries: entry.list()?,
                        index: 0,
                    })
                } else {
                    None
                };
                (path, push)
            };
            let depth = self.stack.len() - 1;
            if let Some(frame) = push {
                self.stack.push(frame);
            }
            let entry = self.stack[depth].entries[index].as_ref();
            return Ok(Some((path, entry)));
        }
    }

    /// Discard the remaining descendants of the most recently yielded
    /// directory.
    pub fn skip(&mut self) {
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_walk_depth_first() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("a/one.go"), "package a\n").unwrap();
        fs::write(root.join("top.go"), "package root\n").unwrap();

        let entry = FsEntry::dir(root);
        let mut walker = walk("work", Box::new(entry));

        let mut paths = Vec::new();
        while let Some((path, _)) = walker.next().unwrap() {
            paths.push(path);
        }
        assert_eq!(
            paths,
            [
                "work/root",
                "work/root/a",
                "work/root/a/one.go",
                "work/root/top.go",
            ]
        );
    }

    #[test]
    fn test_skip_discards_descendants() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("skipme/deep")).unwrap();
        fs::write(root.join("skipme/deep/file.go"), "package deep\n").unwrap();
        fs::write(root.join("zz.go"), "package root\n").unwrap();

        let entry = FsEntry::dir(root);
        let mut walker = walk("work", Box::new(entry));

        let mut paths = Vec::new();
        while let Some((path, entry)) = walker.next().unwrap() {
            let skip = entry.is_dir() && entry.name() == "skipme";
            paths.push(path);
            if skip {
                walker.skip();
            }
        }
        assert_eq!(paths, ["work/root", "work/root/skipme", "work/root/zz.go"]);
    }
}
