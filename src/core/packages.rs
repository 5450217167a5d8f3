//! The package import graph of a module or of a whole solution.

use serde::{Deserialize, Serialize};

use crate::types::{StringGraph, StringSet};

/// Tracks the import and export paths of all the packages in a module, or
/// in an entire solution when unions are taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packages {
    /// The union of all imported and exported packages.
    #[serde(default, skip_serializing_if = "StringSet::is_empty")]
    pub all: StringSet,
    /// Packages that build a main executable. Their imports retain packages
    /// for binaries.
    #[serde(default, skip_serializing_if = "StringSet::is_empty")]
    pub commands: StringSet,
    /// Packages that can be imported.
    #[serde(default, skip_serializing_if = "StringSet::is_empty")]
    pub exports: StringSet,
    /// Which packages a package imports.
    #[serde(default, skip_serializing_if = "StringGraph::is_empty")]
    pub imports: StringGraph,
    /// Which packages a package imports from its test files.
    #[serde(default, skip_serializing_if = "StringGraph::is_empty")]
    pub test_imports: StringGraph,
    /// Which packages import a package: the transpose of `imports`.
    #[serde(default, skip_serializing_if = "StringGraph::is_empty")]
    pub co_imports: StringGraph,
    /// Which packages import a package for tests.
    #[serde(default, skip_serializing_if = "StringGraph::is_empty")]
    pub co_test_imports: StringGraph,
}

impl Packages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any packages have been recorded. Lockfiles do not always
    /// carry a packages section; this tells the loader to analyze the tree.
    pub fn defined(&self) -> bool {
        !self.exports.is_empty()
    }

    /// Record a command (a package with a `main` declaration).
    pub fn command(&mut self, exp: &str) {
        if is_builtin(exp) {
            return;
        }
        self.commands.add(exp);
        self.all.add(exp);
    }

    /// Record an importable package.
    pub fn export(&mut self, exp: &str) {
        if is_builtin(exp) {
            return;
        }
        self.exports.add(exp);
        self.all.add(exp);
    }

    /// Record that a package imports another.
    pub fn import(&mut self, exp: &str, imp: &str) {
        if is_builtin(imp) {
            return;
        }
        self.imports.add(exp, imp);
        self.co_imports.add(imp, exp);
        self.all.add(imp);
        self.all.add(exp);
    }

    /// Record that a package imports another from its tests.
    pub fn test_import(&mut self, exp: &str, imp: &str) {
        if is_builtin(imp) {
            return;
        }
        self.test_imports.add(exp, imp);
        self.co_test_imports.add(imp, exp);
        self.all.add(imp);
        self.all.add(exp);
    }

    /// Subsume the imports and exports of another collection.
    pub fn include(&mut self, other: &Packages) {
        self.all.include(&other.all);
        self.commands.include(&other.commands);
        self.exports.include(&other.exports);
        self.imports.include(&other.imports);
        self.test_imports.include(&other.test_imports);
        self.co_imports.include(&other.co_imports);
        self.co_test_imports.include(&other.co_test_imports);
    }
}

/// Whether a package is the language's own to provide, as opposed to
/// packages that need to be vendored. Builtin packages have no dot in
/// their first path component.
pub fn is_builtin(pkg: &str) -> bool {
    match pkg.split('/').next() {
        Some(first) => !first.contains('.'),
        None => true,
    }
}

/// The sets of packages transitively imported by the working copy's
/// commands and by its test importers, respectively. Assumes `packages` is
/// a supergraph of `own`.
pub fn necessary_packages(own: &Packages, packages: &Packages) -> (StringSet, StringSet) {
    let imports = packages.imports.transitive(&own.commands);
    let test_importers = own.co_test_imports.source_set();
    let test_imports = packages.imports.transitive(&test_importers);
    (imports, test_imports)
}

/// The sets of packages that are imported but exported by nothing, for
/// normal imports and test imports respectively.
pub fn missing_packages(own: &Packages, packages: &Packages) -> (StringSet, StringSet) {
    let mut packages = packages.clone();
    packages.include(own);
    let (mut imports, mut test_imports) = necessary_packages(own, &packages);
    imports.exclude(&packages.exports);
    imports.exclude(&packages.commands);
    test_imports.exclude(&packages.exports);
    test_imports.exclude(&imports);
    (imports, test_imports)
}
