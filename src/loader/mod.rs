//! The loader: lazy enrichment of sparse module references.
//!
//! A `Memo` owns every cache that makes a dependency session affordable:
//! resolved remotes, fetched repositories, digested references, finished
//! modules, package graphs, and commit records. Expensive operations
//! happen at most once per session.

pub mod discover;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use rand::Rng;

use crate::analyze;
use crate::cancel::Cancel;
use crate::config::Config;
use crate::core::module::{Module, Modules};
use crate::core::packages::Packages;
use crate::core::patterns::Patterns;
use crate::git::{root_for_remote, Commit, GitCache};
use crate::lockfile;
use crate::types::{
    parse_hash_prefix, parse_version, Hash, StringGraph, StringSet, Version, NO_VERSION,
};
use crate::ui::Progress;

/// The maximum number of attempts to fetch a module's repository.
pub const FETCH_MAX_ATTEMPTS: u32 = 5;

/// The base wait between the first and second fetch attempts; later waits
/// back off exponentially with full jitter.
pub const FETCH_FIRST_ATTEMPT_WAIT: std::time::Duration = std::time::Duration::from_secs(5);

/// The ceiling on the wait between fetch attempts.
pub const FETCH_MAX_ATTEMPT_WAIT: std::time::Duration = std::time::Duration::from_secs(60);

/// The loader interface the solver depends on: enrich one module, or a
/// batch with progress.
pub trait SolverLoader {
    fn finish_module(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        module: &mut Module,
    ) -> Result<()>;

    fn finish_modules(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        modules: &mut [Module],
    ) -> Result<()>;
}

/// The wider interface the add-missing and upgrade workflows depend on.
pub trait WorkflowLoader: SolverLoader {
    fn finish_remote(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        module: &mut Module,
    ) -> Result<()>;

    fn fetch(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        module: &mut Module,
        max_attempts: u32,
    ) -> Result<()>;

    fn digest_refs(&mut self, cancel: &Cancel, out: &dyn Progress, module: &Module) -> Result<()>;

    fn finish_packages(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        modules: &mut [Module],
    ) -> Result<()>;

    fn read_versions(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        module: &Module,
    ) -> Result<Modules>;
}

/// All the session state for managing dependencies.
pub struct Memo {
    work_dir: PathBuf,
    go_path: Vec<String>,
    repo: Rc<GitCache>,

    /// Remote URL by package name; seeded from lockfiles, overridden by
    /// config patterns, filled by discovery, invalidated on fetch failure.
    remotes: BTreeMap<String, String>,
    /// Remotes fetched once in this session.
    fetched: StringSet,
    /// Reference names by commit hash hex.
    refs: StringGraph,
    /// Known commit hashes by root.
    versions: BTreeMap<String, Vec<Hash>>,
    /// Fully-read revision lists by root.
    finished_versions: BTreeMap<String, Modules>,
    /// Package graphs by "hash:name".
    packages: BTreeMap<String, Packages>,
    /// Memoized enrichment results by pre-normalization hash.
    finished: HashMap<Hash, (Module, Option<String>)>,
    /// Commit records by every hash on the tag chain leading to them.
    commits: HashMap<Hash, Commit>,

    /// The working copy's own package name and import graph.
    own_name: String,
    own_packages: Packages,

    patterns: Patterns,
    mirror_rules: std::collections::BTreeSet<usize>,
    recommended: BTreeMap<String, Version>,
    excludes: StringSet,
    vendor_cache: String,
    pulled_vendor_cache: bool,
    offline: bool,
}

impl Memo {
    /// Open a session over the bare cache in the working copy and read the
    /// configuration.
    pub fn new(work_dir: impl Into<PathBuf>, go_path: Vec<String>) -> Result<Memo> {
        let work_dir = work_dir.into();
        let repo = GitCache::open(work_dir.join(crate::CACHE_DIR), &work_dir)
            .context("cannot open the bare repository cache")?;
        let config = Config::read(&work_dir)?;
        Ok(Memo {
            work_dir,
            go_path,
            repo: Rc::new(repo),
            remotes: BTreeMap::new(),
            fetched: StringSet::new(),
            refs: StringGraph::new(),
            versions: BTreeMap::new(),
            finished_versions: BTreeMap::new(),
            packages: BTreeMap::new(),
            finished: HashMap::new(),
            commits: HashMap::new(),
            own_name: String::new(),
            own_packages: Packages::new(),
            patterns: config.patterns(),
            mirror_rules: config.mirror_rules(),
            recommended: config.recommended(),
            excludes: config.excludes(),
            vendor_cache: config.cache.clone(),
            pulled_vendor_cache: false,
            offline: false,
        })
    }

    /// Disable all network effects for the session.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn repo(&self) -> &Rc<GitCache> {
        &self.repo
    }

    pub fn recommended(&self) -> &BTreeMap<String, Version> {
        &self.recommended
    }

    pub fn vendor_cache(&self) -> &str {
        &self.vendor_cache
    }

    /// Read the working copy's lockfile and render normalized, fetched
    /// modules. The lockfile's remotes prime the remote cache as the
    /// authority.
    pub fn read_own_modules(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
    ) -> Result<Modules> {
        let mut modules = lockfile::read_own_modules(&self.work_dir)?;
        for module in modules.iter() {
            cancel.check()?;
            if !module.remote.is_empty() {
                self.remotes
                    .insert(module.name.clone(), module.remote.clone());
            }
        }
        self.finish_modules(cancel, out, &mut modules)?;
        Ok(modules)
    }

    /// The working copy's memoized package name and import graph.
    pub fn read_own_packages(&mut self, out: &dyn Progress) -> Result<(String, Packages)> {
        if self.own_packages.defined() {
            return Ok((self.own_name.clone(), self.own_packages.clone()));
        }
        out.start("Reading packages in working copy");
        let work_dir = self.work_dir.to_string_lossy().to_string();
        let result = analyze::read_own_packages(&work_dir, &self.go_path, &self.excludes);
        out.stop("Reading packages in working copy");
        let (name, packages) = result?;
        self.own_name = name.clone();
        self.own_packages = packages.clone();
        Ok((name, packages))
    }

    fn memo_finish_module(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        module: &mut Module,
    ) -> Result<()> {
        module.finished = true;

        self.resolve_remote(cancel, out, module)?;

        // Resolve the hash to a canonical commit, fetching on a miss.
        let mut commit = None;
        if !module.hash.is_none() {
            match self.commit(out, module.hash) {
                Ok(found) => {
                    module.fetched = true;
                    commit = Some(found);
                }
                Err(_) => {
                    if let Err(err) = self.fetch(cancel, out, module, FETCH_MAX_ATTEMPTS) {
                        module.fetch_error = Some(err.to_string());
                        out.write(&format!(
                            "Unable to fetch module {}: {err}\n",
                            module.summary()
                        ));
                    } else {
                        match self.commit(out, module.hash) {
                            Ok(found) => {
                                module.fetched = true;
                                commit = Some(found);
                            }
                            Err(err) => module.warnings.push(format!(
                                "Dependency {} no longer exists locally nor at {}: {err}",
                                module.summary(),
                                module.remote
                            )),
                        }
                    }
                }
            }
        }

        if let Some(commit) = commit {
            // Normalize a tag hash to the hash of its commit.
            module.hash = commit.hash;
        }

        // Infer the best reference and version from digested references.
        if module.reference.is_empty() {
            if let Err(err) = self.digest_refs_for(cancel, out, module) {
                module
                    .warnings
                    .push(format!("Cannot digest references: {err}"));
            }
            self.finish_module_ref(module);
            if let Some(tag) = module.reference.strip_prefix("tags/") {
                module.version = parse_version(tag);
            } else if let Some(head) = module.reference.strip_prefix("heads/") {
                module.version = parse_version(head);
            }
        }

        if module.time.is_none() {
            match commit {
                Some(commit) => module.time = Some(commit.time),
                None => module
                    .warnings
                    .push("Cannot infer commit timestamp: commit unavailable".to_string()),
            }
        }

        // Read the revision's own constraints from its embedded lockfile.
        if let Some(commit) = commit {
            if !module.no_lock {
                self.read_embedded_lock(commit, module);
            }
        }

        Ok(())
    }

    /// Attach the shallow constraints declared by the revision's own
    /// glide.lock or Gopkg.lock, never carrying transitive test imports.
    fn read_embedded_lock(&mut self, commit: Commit, module: &mut Module) {
        let entries = match self.repo.tree_entries(commit.tree) {
            Ok(entries) => entries,
            Err(err) => {
                module
                    .warnings
                    .push(format!("Cannot list tree for {}: {err}", module.summary()));
                return;
            }
        };
        let find = |name: &str| entries.iter().find(|entry| entry.name == name && !entry.is_dir);

        if let Some(entry) = find("glide.lock") {
            module.glidelock = entry.hash;
            match self
                .repo
                .read_blob(entry.hash)
                .map_err(anyhow::Error::from)
                .and_then(|bytes| {
                    let mut lock = lockfile::read_glide_lock(&bytes)?;
                    // A dependency's test imports are its own business.
                    lock.test_imports.clear();
                    Ok(lockfile::modules_from_glide_lock(&lock)?)
                }) {
                Ok(modules) => module.modules = modules,
                Err(err) => module
                    .warnings
                    .push(format!("Cannot read glide.lock: {err}")),
            }
        } else if let Some(entry) = find("Gopkg.lock") {
            module.deplock = entry.hash;
            match self
                .repo
                .read_blob(entry.hash)
                .map_err(anyhow::Error::from)
                .and_then(|bytes| {
                    Ok(lockfile::modules_from_dep_lock(&lockfile::read_dep_lock(
                        &bytes,
                    )?)?)
                }) {
                Ok(modules) => module.modules = modules,
                Err(err) => module
                    .warnings
                    .push(format!("Cannot read Gopkg.lock: {err}")),
            }
        } else {
            module.no_lock = true;
        }
    }

    /// Resolve the remote URL for a module's package name, trying each
    /// strategy in turn: the session cache, a `.git` path truncation, a
    /// config pattern, the lockfile's own value, an offline guess, and
    /// finally HTTP discovery.
    fn resolve_remote(
        &mut self,
        _cancel: &Cancel,
        out: &dyn Progress,
        module: &mut Module,
    ) -> Result<()> {
        loop {
            if let Some(remote) = self.remotes.get(&module.name) {
                module.remote = remote.clone();
                break;
            }

            // Package names that contain ".git" name the repository
            // directly.
            if let Some(index) = module.name.find(".git/") {
                module.name.truncate(index + 4);
                module.exact_remote = true;
                continue;
            }

            if let Some((name, remote, rule)) = self.patterns.replace(&module.name) {
                self.remotes.insert(name.clone(), remote.clone());
                if self.mirror_rules.contains(&rule) {
                    module.gitolite_mirror = true;
                }
                module.name = name;
                module.remote = remote;
                module.exact_remote = true;
                break;
            }

            if !module.remote.is_empty() {
                break;
            }

            if self.offline {
                module.remote = format!("https://{}", module.name);
                self.remotes
                    .insert(module.name.clone(), module.remote.clone());
                module.warnings.push(format!(
                    "The remote location {} may be corrupt. This module was obtained in \
                     offline mode so no HTTP request was sent to validate the assumed \
                     location of its remote repository.",
                    module.name
                ));
                break;
            }

            // The web is the source of truth, as a last resort.
            let status = format!("Looking up remote for package {}", module.name);
            out.start(&status);
            let (remote, name) = discover::remote_for_package(&module.name);
            out.stop(&status);
            tracing::debug!("remote for {name} is {remote}");
            module.remote = remote;
            module.name = name;
            self.remotes
                .insert(module.name.clone(), module.remote.clone());
            break;
        }

        module.root = root_for_remote(&module.remote);
        Ok(())
    }

    /// Record all references that point at the module's commit and pick
    /// the best one.
    fn finish_module_ref(&mut self, module: &mut Module) {
        let prefix = format!("refs/vendor/{}/", module.root);

        let mut refs = Vec::new();
        if let Some(names) = self.refs.targets(&module.hash.to_hex()) {
            for name in names.iter() {
                if let Some(short) = name.strip_prefix(&prefix) {
                    refs.push(short.to_string());
                }
            }
        }

        let (best_ref, best_version) = best_reference(&refs);
        module.refs = refs;
        module.reference = best_ref;
        module.version = best_version;
    }

    /// Look up the commit for a commit or tag hash, following tag chains
    /// and memoizing every hash on the path. Pulls the shared vendor cache
    /// the first time anything needs an object.
    pub fn commit(&mut self, out: &dyn Progress, hash: Hash) -> Result<Commit> {
        if !self.vendor_cache.is_empty() && !self.pulled_vendor_cache {
            self.pulled_vendor_cache = true;
            if let Err(err) = self.repo.pull_vendor_cache(&self.vendor_cache) {
                out.write(&format!("Unable to fetch vendor references cache: {err}\n"));
            }
        }

        if let Some(commit) = self.commits.get(&hash) {
            return Ok(*commit);
        }

        let (commit, intermediates) = self.repo.resolve_commit(hash)?;
        for hash in intermediates {
            self.commits.insert(hash, commit);
        }
        Ok(commit)
    }

    /// The commit timestamp for a commit or tag hash.
    pub fn commit_time(&mut self, out: &dyn Progress, hash: Hash) -> Result<chrono::DateTime<chrono::Utc>> {
        Ok(self.commit(out, hash)?.time)
    }

    fn digest_refs_for(
        &mut self,
        _cancel: &Cancel,
        out: &dyn Progress,
        module: &Module,
    ) -> Result<()> {
        let refs = self
            .repo
            .enumerate_refs(&module.root)
            .with_context(|| {
                format!(
                    "cannot digest references from the git repository for package root {}",
                    module.root
                )
            })?;
        let mut versions = Vec::new();
        for (name, hash) in refs {
            let commit = self.commit(out, hash).with_context(|| {
                format!(
                    "cannot digest references for package root {}, following commit {hash}",
                    module.root
                )
            })?;
            self.refs.add(commit.hash.to_hex(), name);
            versions.push(commit.hash);
        }
        self.versions.insert(module.root.clone(), versions);
        Ok(())
    }

    /// Find a module that satisfies a spec and test requirement. The spec
    /// is a package name optionally followed by `@version`, `@ref`, or
    /// `@hash-prefix`. Without a suffix, configured recommended versions
    /// apply first.
    pub fn find_module(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        spec: &str,
        test: bool,
    ) -> Result<Module> {
        let (name, suffix) = match spec.split_once('@') {
            Some((name, suffix)) => (name, suffix),
            None => (spec, ""),
        };

        let range = parse_hash_prefix(suffix).filter(|_| !suffix.is_empty());

        let mut module = Module {
            name: name.to_string(),
            test,
            version: parse_version(suffix),
            ..Module::default()
        };

        self.finish_remote(cancel, out, &mut module)?;
        if let Err(err) = self.fetch(cancel, out, &mut module, FETCH_MAX_ATTEMPTS) {
            out.write(&format!(
                "warning: Failed to fetch for {}: {err}\n",
                module.summary()
            ));
        }

        let versions = self.read_versions(cancel, out, &module)?;
        if versions.is_empty() {
            bail!("no versions of {} found online or in cache", module.name);
        }

        if module.version != NO_VERSION {
            let version = module.version;
            return versions.find_version(version).cloned().ok_or_else(|| {
                anyhow!(
                    "cannot find a version of {} that satisfies version {version}",
                    module.name
                )
            });
        }
        if let Some((min, max)) = range {
            return versions.find_hash(min, max).cloned().ok_or_else(|| {
                anyhow!(
                    "cannot find a version of {} between hashes [{min}, {max}]",
                    module.name
                )
            });
        }
        if suffix.is_empty() {
            if let Some(recommended) = self.recommended.get(&module.name) {
                if let Some(found) = versions.find_version(*recommended) {
                    return Ok(found.clone());
                }
            }
            let numbered = versions.filter_numbered_versions();
            return if numbered.is_empty() {
                versions
                    .find_reference("heads/master")
                    .cloned()
                    .ok_or_else(|| anyhow!("unable to find a version tag or master branch"))
            } else {
                Ok(numbered.last().cloned().unwrap_or_default())
            };
        }
        versions
            .find_reference(suffix)
            .cloned()
            .ok_or_else(|| anyhow!("cannot find specified reference {suffix}"))
    }
}

impl SolverLoader for Memo {
    /// Fill in the blanks in a module, idempotently. The result, success
    /// or failure, is memoized by the module's pre-normalization hash;
    /// modules with no hash are left sparse.
    fn finish_module(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        module: &mut Module,
    ) -> Result<()> {
        if module.hash.is_none() {
            return Ok(());
        }
        if let Some((found, error)) = self.finished.get(&module.hash) {
            *module = found.clone();
            return match error {
                Some(message) => Err(anyhow!("{message}")),
                None => Ok(()),
            };
        }
        let key = module.hash;
        let result = self.memo_finish_module(cancel, out, module);
        self.finished.insert(
            key,
            (
                module.clone(),
                result.as_ref().err().map(|err| err.to_string()),
            ),
        );
        result
    }

    /// Enrich a batch, accumulating per-module failures as warnings
    /// rather than failing the batch.
    fn finish_modules(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        modules: &mut [Module],
    ) -> Result<()> {
        let start = chrono::Utc::now();
        out.start("Reading modules");
        let total = modules.len();
        for (i, module) in modules.iter_mut().enumerate() {
            cancel.check()?;
            if let Err(err) = self.finish_module(cancel, out, module) {
                out.write(&format!(
                    "Failed to finish reading module {}: {err}\n",
                    module.summary()
                ));
            }
            out.progress("Reading modules", i + 1, total, start, chrono::Utc::now());
        }
        out.stop("Reading modules");
        Ok(())
    }
}

impl WorkflowLoader for Memo {
    fn finish_remote(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        module: &mut Module,
    ) -> Result<()> {
        self.resolve_remote(cancel, out, module)
    }

    /// Sync a module's repository with its remote, once per remote per
    /// session, with exponential backoff and full jitter. Every other
    /// failure abandons the cached remote in case the package moved.
    fn fetch(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        module: &mut Module,
        max_attempts: u32,
    ) -> Result<()> {
        if self.offline {
            return Ok(());
        }
        if module.name.is_empty() {
            out.write(&format!(
                "Cannot fetch {} because the package name is blank.\n",
                module.summary()
            ));
            return Ok(());
        }
        if module.remote.is_empty() {
            out.write(&format!(
                "Cannot fetch {} because the remote is empty.\n",
                module.summary()
            ));
            return Ok(());
        }

        self.finish_remote(cancel, out, module)?;

        if self.fetched.has(&module.remote) {
            return Ok(());
        }
        self.fetched.add(module.remote.clone());

        let fetching = format!("Fetching {}", module.remote);
        out.start(&fetching);

        if module.gitolite_mirror && !module.gitolite_mirror_created {
            crate::git::mirror::create_mirror(out, &module.remote)?;
            module.gitolite_mirror_created = true;
        }

        let mut attempts = 0u32;
        let result = loop {
            if let Err(cancelled) = cancel.check() {
                break Err(cancelled.into());
            }
            match self.repo.fetch_root_remote(&module.root, &module.remote) {
                Ok(()) => break Ok(()),
                Err(err) => {
                    attempts += 1;
                    if attempts > max_attempts {
                        break Err(anyhow::Error::from(err));
                    }

                    let ceiling = FETCH_MAX_ATTEMPT_WAIT
                        .min(FETCH_FIRST_ATTEMPT_WAIT * 2u32.saturating_pow(attempts));
                    let wait = rand::thread_rng()
                        .gen_range(std::time::Duration::ZERO..=ceiling);
                    out.write(&format!(
                        "Error fetching {}. Attempt {attempts}. Retrying in {wait:?}.\n",
                        module.remote
                    ));
                    std::thread::sleep(wait);

                    // Lose faith in the cached remote: the package may have
                    // moved.
                    if attempts % 2 == 0 {
                        self.remotes.remove(&module.name);
                        module.remote.clear();
                        self.finish_remote(cancel, out, module)?;
                    }
                }
            }
        };
        out.stop(&fetching);
        tracing::debug!(
            "fetched {} from {} after {attempts} retries",
            module.name,
            module.remote
        );
        result
    }

    fn digest_refs(&mut self, cancel: &Cancel, out: &dyn Progress, module: &Module) -> Result<()> {
        self.digest_refs_for(cancel, out, module)
    }

    /// Attach the package import graph of each module by analyzing the
    /// source files of its committed tree. Failures accumulate as
    /// warnings.
    fn finish_packages(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        modules: &mut [Module],
    ) -> Result<()> {
        let start = chrono::Utc::now();
        out.start("Reading packages");
        let total = modules.len();
        for (i, module) in modules.iter_mut().enumerate() {
            cancel.check()?;
            if !module.packages.defined() {
                if let Err(err) = self.digest_git_packages(out, module) {
                    module.warnings.push(format!("Cannot read packages: {err}"));
                }
            }
            out.progress("Reading packages", i + 1, total, start, chrono::Utc::now());
        }
        out.stop("Reading packages");
        Ok(())
    }

    /// All known revisions of a module's package, each fully enriched, in
    /// canonical order. Memoized per root.
    fn read_versions(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        module: &Module,
    ) -> Result<Modules> {
        let status = format!("Finding versions of {}", module.name);
        out.start(&status);
        let result = self.read_versions_inner(cancel, out, module);
        out.stop(&status);
        result
    }
}

impl Memo {
    fn read_versions_inner(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        module: &Module,
    ) -> Result<Modules> {
        if let Some(modules) = self.finished_versions.get(&module.root) {
            return Ok(modules.clone());
        }

        let mut probe = module.clone();
        self.fetch(cancel, out, &mut probe, FETCH_MAX_ATTEMPTS)?;
        self.digest_refs_for(cancel, out, &probe)?;

        let mut modules = Modules::new();
        for hash in self.versions.get(&probe.root).cloned().unwrap_or_default() {
            modules.push(Module {
                hash,
                name: probe.name.clone(),
                root: probe.root.clone(),
                test: probe.test,
                ..Module::default()
            });
        }
        self.finish_modules(cancel, out, &mut modules)?;
        modules.sort();
        self.finished_versions
            .insert(probe.root.clone(), modules.clone());
        Ok(modules)
    }

    fn digest_git_packages(&mut self, out: &dyn Progress, module: &mut Module) -> Result<()> {
        let key = format!("{}:{}", module.hash, module.name);
        if module.packages.defined() {
            // Prime the cache from the lockfile.
            self.packages.insert(key, module.packages.clone());
            return Ok(());
        }
        if let Some(packages) = self.packages.get(&key) {
            module.packages = packages.clone();
            return Ok(());
        }

        let commit = self.commit(out, module.hash)?;
        analyze::read_git_packages(Rc::clone(&self.repo), commit.tree, module).with_context(
            || {
                format!(
                    "cannot analyze packages in {} from commit {}",
                    module.summary(),
                    module.hash
                )
            },
        )?;
        self.packages.insert(key, module.packages.clone());
        Ok(())
    }
}

/// The best reference among those pointing at one commit: the highest
/// version tag wins; otherwise `heads/master` beats every other branch;
/// otherwise the last reference in lexicographic order, which is
/// arbitrary but consistent.
fn best_reference(refs: &[String]) -> (String, Version) {
    let mut best_ref = String::new();
    let mut best_version = NO_VERSION;
    for short in refs {
        if let Some(tag) = short.strip_prefix("tags/") {
            let version = parse_version(tag);
            if best_version < version {
                best_version = version;
                best_ref = short.clone();
            }
        } else if best_version == NO_VERSION
            && best_ref != "heads/master"
            && (short.as_str() == "heads/master" || short.as_str() > best_ref.as_str())
        {
            best_ref = short.clone();
        }
    }
    (best_ref, best_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_best_reference_prefers_highest_version_tag() {
        let (best, version) = best_reference(&refs(&[
            "heads/master",
            "tags/v1.2.0",
            "tags/v1.10.0",
        ]));
        assert_eq!(best, "tags/v1.10.0");
        assert_eq!(version, Version::new(1, 10, 0));
    }

    #[test]
    fn test_best_reference_master_beats_other_branches() {
        // A commit that is the head of both master and a branch that
        // sorts after it keeps master, in either encounter order.
        let (best, version) = best_reference(&refs(&["heads/master", "heads/release"]));
        assert_eq!(best, "heads/master");
        assert_eq!(version, NO_VERSION);

        let (best, _) = best_reference(&refs(&["heads/release", "heads/master"]));
        assert_eq!(best, "heads/master");

        let (best, _) = best_reference(&refs(&[
            "heads/master",
            "heads/next",
            "heads/stable",
        ]));
        assert_eq!(best, "heads/master");
    }

    #[test]
    fn test_best_reference_lexicographically_greatest_otherwise() {
        let (best, version) = best_reference(&refs(&["heads/alpha", "heads/beta"]));
        assert_eq!(best, "heads/beta");
        assert_eq!(version, NO_VERSION);
    }

    #[test]
    fn test_best_reference_unversioned_tag_does_not_win() {
        // A tag that does not parse as a version never becomes the best
        // reference; master still wins.
        let (best, version) = best_reference(&refs(&["heads/master", "tags/v1.0.0-rc1"]));
        assert_eq!(best, "heads/master");
        assert_eq!(version, NO_VERSION);
    }

    #[test]
    fn test_best_reference_empty() {
        let (best, version) = best_reference(&[]);
        assert_eq!(best, "");
        assert_eq!(version, NO_VERSION);
    }
}
