//! The bare git repository that caches every fetched dependency revision.
//!
//! All fetched refs live under `refs/vendor/<root>/{heads,tags}/*`, where
//! `<root>` is the cache key derived from the remote URL. The adapter
//! shells out to `git` with an isolated environment so the caller's own
//! repository and index are never touched.

pub mod mirror;

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::core::module::Modules;
use crate::types::Hash;
use crate::ui::Progress;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("IO error running git: {0}")]
    Io(#[from] std::io::Error),

    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("object {0} not found")]
    Missing(Hash),

    #[error("tag chain from {0} ends at a {1}, not a commit")]
    NotCommit(Hash, String),

    #[error("cannot parse git output for {0}: {1}")]
    Parse(Hash, String),
}

/// A record of a resolved commit: its hash, its tree, and the committer
/// timestamp that orders revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub hash: Hash,
    pub tree: Hash,
    pub time: DateTime<Utc>,
}

/// One row of a git tree listing.
#[derive(Debug, Clone)]
pub struct TreeRecord {
    pub name: String,
    pub is_dir: bool,
    pub hash: Hash,
}

/// A handle on the bare repository in the working copy.
pub struct GitCache {
    git_dir: PathBuf,
    work_dir: PathBuf,
}

impl GitCache {
    /// Open the bare repository, creating it if absent. The repository
    /// ignores all of its own contents so it never shows up in the status
    /// of the surrounding working copy.
    pub fn open(git_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Result<Self, GitError> {
        let cache = GitCache {
            git_dir: git_dir.into(),
            work_dir: work_dir.into(),
        };
        if !cache.git_dir.join("HEAD").exists() {
            std::fs::create_dir_all(&cache.git_dir)?;
            // A plain command: init rejects a work-tree environment.
            let output = Command::new("git")
                .arg("init")
                .arg("--bare")
                .arg("--quiet")
                .arg(&cache.git_dir)
                .stdin(Stdio::null())
                .output()?;
            if !output.status.success() {
                return Err(GitError::Command {
                    command: "init --bare".to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
        }
        let _ = std::fs::write(cache.git_dir.join(".gitignore"), "*\n");
        Ok(cache)
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Fetch every branch and tag of a dependency into its vendor
    /// namespace, discarding the upstream tag namespace.
    pub fn fetch_root_remote(&self, root: &str, remote: &str) -> Result<(), GitError> {
        self.run(&[
                "fetch",
                remote,
                &format!("+refs/heads/*:refs/vendor/{root}/heads/*"),
                &format!("+refs/tags/*:refs/vendor/{root}/tags/*"),
                "-f",
                "--no-tags",
                "--recurse-submodules",
            ])?;
        Ok(())
    }

    /// Fetch all vendor references from a shared remote cache.
    pub fn pull_vendor_cache(&self, remote: &str) -> Result<(), GitError> {
        self.run(&[
                "fetch",
                remote,
                "+refs/vendor/*:refs/vendor/*",
                "-f",
                "--no-tags",
                "--recurse-submodules",
            ])?;
        Ok(())
    }

    /// Push the vendor references to a shared remote cache, except those
    /// that cannot fast-forward.
    pub fn push_vendor_cache(&self, remote: &str) -> Result<(), GitError> {
        self.run(&["push", remote, "refs/vendor/*"])?;
        Ok(())
    }

    /// The object type of a hash: `commit`, `tag`, `tree`, or `blob`.
    pub fn object_type(&self, hash: Hash) -> Result<String, GitError> {
        let out = self.run(&["cat-file", "-t", &hash.to_string()])
            .map_err(|_| GitError::Missing(hash))?;
        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }

    /// Follow a chain of tag objects until a commit is reached, returning
    /// the commit record and every intermediate hash on the path so the
    /// caller can memoize them all.
    pub fn resolve_commit(&self, hash: Hash) -> Result<(Commit, Vec<Hash>), GitError> {
        let mut hash = hash;
        let mut intermediates = Vec::new();
        loop {
            intermediates.push(hash);
            match self.object_type(hash)?.as_str() {
                "commit" => {
                    let commit = self.commit_record(hash)?;
                    return Ok((commit, intermediates));
                }
                "tag" => hash = self.tag_target(hash)?,
                other => return Err(GitError::NotCommit(hash, other.to_string())),
            }
        }
    }

    fn tag_target(&self, hash: Hash) -> Result<Hash, GitError> {
        let out = self.run(&["cat-file", "tag", &hash.to_string()])?;
        let text = String::from_utf8_lossy(&out);
        for line in text.lines() {
            if let Some(target) = line.strip_prefix("object ") {
                return Hash::parse(target.trim())
                    .ok_or_else(|| GitError::Parse(hash, line.to_string()));
            }
        }
        Err(GitError::Parse(hash, "tag without object line".to_string()))
    }

    fn commit_record(&self, hash: Hash) -> Result<Commit, GitError> {
        let out = self.run(&["cat-file", "commit", &hash.to_string()])?;
        let text = String::from_utf8_lossy(&out);
        let mut tree = None;
        let mut time = None;
        for line in text.lines() {
            if line.is_empty() {
                break;
            }
            if let Some(rest) = line.strip_prefix("tree ") {
                tree = Hash::parse(rest.trim());
            } else if let Some(rest) = line.strip_prefix("committer ") {
                time = parse_ident_time(rest);
            }
        }
        match (tree, time) {
            (Some(tree), Some(time)) => Ok(Commit { hash, tree, time }),
            _ => Err(GitError::Parse(hash, "malformed commit object".to_string())),
        }
    }

    /// All references under `refs/vendor/<root>/`, excluding review-bot
    /// namespaces, paired with the hash each points at. The hashes are not
    /// yet normalized to commits.
    pub fn enumerate_refs(&self, root: &str) -> Result<Vec<(String, Hash)>, GitError> {
        let prefix = format!("refs/vendor/{root}/");
        let out = self.run(&[
                "for-each-ref",
                "--format=%(objectname) %(refname)",
                &prefix,
            ])?;
        let text = String::from_utf8_lossy(&out);
        let mut refs = Vec::new();
        for line in text.lines() {
            let Some((hex, name)) = line.split_once(' ') else {
                continue;
            };
            if name.contains("/phabricator/") {
                continue;
            }
            if let Some(hash) = Hash::parse(hex) {
                refs.push((name.to_string(), hash));
            }
        }
        Ok(refs)
    }

    /// The raw contents of a blob object.
    pub fn read_blob(&self, hash: Hash) -> Result<Vec<u8>, GitError> {
        self.run(&["cat-file", "blob", &hash.to_string()])
    }

    /// The entries of a tree object.
    pub fn tree_entries(&self, hash: Hash) -> Result<Vec<TreeRecord>, GitError> {
        let out = self.run(&["ls-tree", &hash.to_string()])?;
        let text = String::from_utf8_lossy(&out);
        let mut records = Vec::new();
        for line in text.lines() {
            // <mode> SP <type> SP <hash> TAB <name>
            let Some((meta, name)) = line.split_once('\t') else {
                continue;
            };
            let fields: Vec<&str> = meta.split_whitespace().collect();
            if fields.len() != 3 {
                return Err(GitError::Parse(hash, line.to_string()));
            }
            let entry_hash = Hash::parse(fields[2])
                .ok_or_else(|| GitError::Parse(hash, line.to_string()))?;
            records.push(TreeRecord {
                name: name.to_string(),
                is_dir: fields[1] == "tree",
                hash: entry_hash,
            });
        }
        Ok(records)
    }

    /// Build a `vendor/` directory from the given modules: stage each
    /// module's tree under `vendor/<name>` in the isolated index, remove
    /// the stale vendor directory, and materialize the staged files.
    pub fn checkout_modules(&self, out: &dyn Progress, modules: &Modules) -> Result<(), GitError> {
        self.run(&["read-tree", "--empty"])?;

        let start = Utc::now();
        for (i, module) in modules.iter().enumerate() {
            self.run(&[
                    "read-tree",
                    "--prefix",
                    &format!("vendor/{}", module.name),
                    &module.hash.to_string(),
                ])?;
            out.progress("Staging modules", i + 1, modules.len(), start, Utc::now());
        }

        out.start("Removing stale vendor");
        let vendor = self.work_dir.join("vendor");
        if vendor.exists() {
            std::fs::remove_dir_all(&vendor)?;
        }
        out.stop("Removing stale vendor");

        out.start("Writing staged vendor");
        let result = self.run(&["checkout-index", "-af"]);
        out.stop("Writing staged vendor");
        result?;
        Ok(())
    }

    /// Run git against the bare cache with an isolated index and the
    /// working copy as the work tree, capturing stdout.
    fn run(&self, args: &[&str]) -> Result<Vec<u8>, GitError> {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .env("GIT_DIR", &self.git_dir)
            .env("GIT_WORK_TREE", &self.work_dir)
            .env("GIT_INDEX_FILE", self.git_dir.join("INDEX"))
            .current_dir(&self.work_dir)
            .stdin(Stdio::null());
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(GitError::Command {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// Parse the timestamp out of a `committer Name <email> epoch zone` line.
fn parse_ident_time(ident: &str) -> Option<DateTime<Utc>> {
    let mut fields = ident.rsplit(' ');
    let _zone = fields.next()?;
    let epoch: i64 = fields.next()?.parse().ok()?;
    Utc.timestamp_opt(epoch, 0).single()
}

/// Compute the cache key for a remote repository: strip the protocol,
/// userinfo, and a `.git` suffix, and flatten `:` to `/` so the key is
/// usable inside a git reference.
pub fn root_for_remote(remote: &str) -> String {
    let mut remote = remote.strip_suffix(".git").unwrap_or(remote);
    if let Some((_, rest)) = remote.split_once('@') {
        remote = rest;
    }
    for prefix in ["https://", "git://"] {
        if let Some(rest) = remote.strip_prefix(prefix) {
            remote = rest;
            break;
        }
    }
    remote.replace(':', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_for_remote() {
        assert_eq!(
            root_for_remote("https://example.com/avery.git"),
            "example.com/avery"
        );
        assert_eq!(
            root_for_remote("git://example.com/avery"),
            "example.com/avery"
        );
        assert_eq!(
            root_for_remote("git@example.com:org/avery.git"),
            "example.com/org/avery"
        );
        assert_eq!(root_for_remote("example.com/avery"), "example.com/avery");
    }

    #[test]
    fn test_parse_ident_time() {
        let time = parse_ident_time("A U Thor <author@example.com> 1136239445 +0100").unwrap();
        assert_eq!(time.timestamp(), 1136239445);
        assert!(parse_ident_time("").is_none());
    }

    #[test]
    fn test_open_creates_bare_repository() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path().join(".vend");
        let cache = GitCache::open(&git_dir, dir.path()).unwrap();
        assert!(git_dir.join("HEAD").exists());
        assert!(git_dir.join(".gitignore").exists());
        // Reopening is idempotent.
        drop(cache);
        GitCache::open(&git_dir, dir.path()).unwrap();
    }
}
