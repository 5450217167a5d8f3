//! The model of one revision of one dependency.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};

use crate::core::packages::Packages;
use crate::types::{Hash, StringSet, Version};

/// A dependency pinned to a git revision.
///
/// Modules begin sparse, often just a name, and the loader fills in the
/// rest: the remote repository, the canonical commit hash, the committer
/// timestamp, the best reference, and the constraints embedded in the
/// revision's own lockfile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    /// The package path that addresses the root of the repository.
    pub name: String,

    /// The commit hash for this revision. A lockfile written by another
    /// tool might carry the hash of an annotated tag; the loader
    /// normalizes it to the hash of the commit.
    pub hash: Hash,

    /// The version triple denoted by a tag on this revision, or
    /// `NO_VERSION`. Versions more specific than three bare numbers are
    /// treated as versionless and ordered by timestamp.
    pub version: Version,

    /// The URL of the repository that contains this module. Cached to be
    /// resilient against network weather.
    pub remote: String,

    /// Whether the remote came from a config pattern match, in which case
    /// the add-missing workflow must not search shorter package names.
    pub exact_remote: bool,

    /// A cache key for the remote, used in git references under the bare
    /// repository.
    pub root: String,

    /// The committer timestamp, a total order over revisions regardless of
    /// whether a version number can be inferred.
    pub time: Option<DateTime<Utc>>,

    /// The best reference that resolves to this commit: the highest
    /// version tag, else `heads/master`, else the last reference in
    /// lexicographic order.
    pub reference: String,

    /// All references to this commit as of the last successful fetch.
    pub refs: Vec<String>,

    /// Whether this module is only needed for tests.
    pub test: bool,

    /// The shallow constraints of this module, as expressed in its own
    /// lockfile.
    pub modules: Modules,

    /// Whether the revision carries no recognizable lockfile. When set and
    /// `modules` is empty, the loader can skip looking for requirements.
    pub no_lock: bool,

    /// This module's package import graph.
    pub packages: Packages,

    /// Problems encountered while reading this module's metadata.
    pub warnings: Vec<String>,

    /// The blob hash of the revision's `glide.lock`, or `NO_HASH`.
    pub glidelock: Hash,

    /// The blob hash of the revision's `Gopkg.lock`, or `NO_HASH`.
    pub deplock: Hash,

    /// The blob hash of the revision's `CHANGELOG.md`, or `NO_HASH`.
    pub changelog: Hash,

    /// The remote is a hosted mirror that may need to be created over SSH
    /// before the first fetch.
    pub gitolite_mirror: bool,

    /// The mirror was created at some point, so creation can be skipped.
    pub gitolite_mirror_created: bool,

    /// This module's repository was fetched during this session.
    pub fetched: bool,

    /// The error produced when this module was last fetched, if any.
    pub fetch_error: Option<String>,

    /// The loader has already enriched this module in this session.
    pub finished: bool,
}

impl Module {
    pub fn named(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            ..Module::default()
        }
    }

    /// A unique inline description: `name@version`, `name@ref`, or
    /// `name@hash`, with a `#test` marker for test-only modules.
    pub fn summary(&self) -> String {
        let test = if self.test { "#test" } else { "" };
        if !self.version.is_none() {
            format!("{}@{}{}", self.name, self.version, test)
        } else if !self.reference.is_empty() {
            format!("{}@{}{}", self.name, self.reference, test)
        } else {
            format!("{}@{}{}", self.name, self.hash, test)
        }
    }

    /// Whether two modules denote the same revision with the same test
    /// status. Enriched fields do not participate.
    pub fn equal(&self, other: &Module) -> bool {
        self.name == other.name && self.hash == other.hash && self.test == other.test
    }

    /// Canonical order: name, then version, then time, then hash.
    ///
    /// Sufficient for deterministically arriving at the most recent version
    /// of every package in a closure of modules, and for displaying
    /// solutions in ascending chronological order. Not sufficient for
    /// deciding whether one module can be upgraded to another.
    pub fn order(&self, other: &Module) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.time.cmp(&other.time))
            .then_with(|| self.hash.cmp(&other.hash))
    }

    /// Whether this module sorts strictly before another.
    pub fn before(&self, other: &Module) -> bool {
        self.order(other) == Ordering::Less
    }

    /// Whether this module is a better guess than the other when we must
    /// add one version of a module knowing nothing about the code that
    /// depends on it: favor the highest version, else the master branch.
    /// Used by add-missing to avoid development branches.
    pub fn better(&self, other: &Module) -> bool {
        if self.reference == "heads/master" && other.version.is_none() {
            return true;
        }
        if self.version.is_none() {
            return false;
        }
        if self.version == other.version {
            return self.time > other.time;
        }
        other.version < self.version
    }

    /// A heuristic for whether this module can be upgraded to another.
    /// Semantic versions abide by their compatibility windows; a module
    /// with no reference may heal to `heads/master`; otherwise upgrades
    /// stay on the same reference and move strictly forward in time.
    pub fn can_upgrade_to(&self, other: &Module) -> bool {
        // Never travel backward in time. Staying in the same time matters
        // only because many tests use the zero time for all versions.
        if self.time > other.time {
            return false;
        }
        if self.version != other.version {
            return self.version.can_upgrade_to(other.version);
        }
        if self.reference.is_empty() {
            return other.reference == "heads/master";
        }
        self.time < other.time && self.reference == other.reference
    }

    /// Whether the module we want conflicts with the module we got.
    pub fn conflicts(&self, other: &Module) -> bool {
        self.hash != other.hash && self.version != other.version && !self.can_upgrade_to(other)
    }
}

impl fmt::Display for Module {
    /// A row with aligned columns: short hash, date, version or reference,
    /// flags, name, references, and a warning count.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = match self.time {
            Some(time) => time.format("%Y-%m-%d").to_string(),
            None => " ".repeat(10),
        };

        let version = if !self.version.is_none() {
            format!(
                "{:>4}.{:>3}.{:>3}",
                self.version.0[0], self.version.0[1], self.version.0[2]
            )
        } else if let Some(tag) = self.reference.strip_prefix("tags/") {
            format!("{tag:>12}")
        } else if let Some(head) = self.reference.strip_prefix("heads/") {
            format!("{head:>12}")
        } else {
            "           ?".to_string()
        };
        let version: String = version.chars().take(12).collect();

        let test = if self.test { "T" } else { " " };
        let lock = if !self.glidelock.is_none() {
            "G"
        } else if !self.deplock.is_none() {
            "D"
        } else {
            " "
        };
        let changelog = if !self.changelog.is_none() { "C" } else { " " };

        let name = if self.name.is_empty() { "-" } else { &self.name };

        let refs = if self.refs.is_empty() {
            String::new()
        } else {
            format!(" ({})", self.refs.join(" "))
        };

        let warnings = match self.warnings.len() {
            0 => String::new(),
            1 => " (warning)".to_string(),
            n => format!(" ({n} warnings)"),
        };

        write!(
            f,
            "{} {} {} {}{}{} {}{}{}",
            self.hash.short(),
            date,
            version,
            test,
            lock,
            changelog,
            name,
            refs,
            warnings
        )
    }
}

/// A sequence of modules: the dependencies of a module, a whole solution,
/// or the revisions of a single package.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modules(pub Vec<Module>);

impl Modules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort into the canonical name, version, time, hash order.
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| a.order(b));
    }

    /// Whether the sequences are pairwise equivalent revisions.
    pub fn equal(&self, others: &Modules) -> bool {
        self.0.len() == others.0.len()
            && self
                .0
                .iter()
                .zip(others.0.iter())
                .all(|(a, b)| a.equal(b))
    }

    /// The union of all the modules' package graphs.
    pub fn packages(&self) -> Packages {
        let mut packages = Packages::new();
        for module in &self.0 {
            packages.include(&module.packages);
        }
        packages
    }

    /// The names of all the modules.
    pub fn names(&self) -> StringSet {
        self.0.iter().map(|module| module.name.clone()).collect()
    }

    /// The module with the shortest reference carrying the given suffix,
    /// suitable for finding `master` among `heads/master` and longer
    /// coincidences.
    pub fn find_reference(&self, reference: &str) -> Option<&Module> {
        let mut found: Option<&Module> = None;
        for module in &self.0 {
            let hit = module.reference == reference
                || module.reference.ends_with(&format!("/{reference}"));
            if hit && found.is_none_or(|f| module.reference.len() < f.reference.len()) {
                found = Some(module);
            }
        }
        found
    }

    /// The first module whose hash falls in the inclusive range.
    pub fn find_hash(&self, min: Hash, max: Hash) -> Option<&Module> {
        self.0.iter().find(|module| module.hash.between(min, max))
    }

    /// The module with the highest version satisfying the given version's
    /// implied compatibility range.
    pub fn find_version(&self, version: Version) -> Option<&Module> {
        let mut version = version;
        let mut found = None;
        for module in &self.0 {
            if version == module.version || version.can_upgrade_to(module.version) {
                version = module.version;
                found = Some(module);
            }
        }
        found
    }

    /// The best guess to fill a missing module: the highest version, or
    /// the master branch when nothing is versioned.
    pub fn find_best_version(&self) -> Option<&Module> {
        let mut best: Option<&Module> = None;
        for module in &self.0 {
            if module.better(best.unwrap_or(&Module::default())) {
                best = Some(module);
            }
        }
        best
    }

    /// The best versioned module that satisfies a semver range, for
    /// manifest files that express ranges rather than pins.
    pub fn find_best_semver(&self, range: &semver::VersionReq) -> Option<&Module> {
        let mut best: Option<&Module> = None;
        for module in &self.0 {
            if module.version.is_none() {
                continue;
            }
            let version = semver::Version::new(
                u64::from(module.version.0[0]),
                u64::from(module.version.0[1]),
                u64::from(module.version.0[2]),
            );
            if range.matches(&version) && module.better(best.unwrap_or(&Module::default())) {
                best = Some(module);
            }
        }
        best
    }

    /// Only the modules with a version number.
    pub fn filter_numbered_versions(&self) -> Modules {
        self.0
            .iter()
            .filter(|module| !module.version.is_none())
            .cloned()
            .collect()
    }

    /// Inline summaries of the modules, sorted, for error messages and
    /// logs.
    pub fn summaries(&self) -> String {
        let mut modules = self.clone();
        modules.sort();
        let summaries: Vec<String> = modules.iter().map(Module::summary).collect();
        format!("[{}]", summaries.join(" "))
    }
}

impl Deref for Modules {
    type Target = Vec<Module>;
    fn deref(&self) -> &Vec<Module> {
        &self.0
    }
}

impl DerefMut for Modules {
    fn deref_mut(&mut self) -> &mut Vec<Module> {
        &mut self.0
    }
}

impl From<Vec<Module>> for Modules {
    fn from(modules: Vec<Module>) -> Self {
        Modules(modules)
    }
}

impl FromIterator<Module> for Modules {
    fn from_iter<I: IntoIterator<Item = Module>>(iter: I) -> Self {
        Modules(iter.into_iter().collect())
    }
}

impl IntoIterator for Modules {
    type Item = Module;
    type IntoIter = std::vec::IntoIter<Module>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Modules {
    type Item = &'a Module;
    type IntoIter = std::slice::Iter<'a, Module>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
