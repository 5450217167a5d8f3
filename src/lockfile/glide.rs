//! The glide.lock codec.
//!
//! The schema matches what the glide tool writes, extended with cached
//! fields so a later run can reconstruct enriched modules without the
//! network. The `updated` timestamp glide writes is deliberately omitted:
//! it would make the mapping from lockfile content hash to vendor tree
//! hash non-deterministic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::module::{Module, Modules};
use crate::core::packages::Packages;
use crate::lockfile::LockfileError;
use crate::types::{parse_version, Hash, StringGraph, StringSet};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlideLock {
    #[serde(default)]
    pub generator: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<GlideLockImport>,
    #[serde(default, rename = "testImports", skip_serializing_if = "Vec::is_empty")]
    pub test_imports: Vec<GlideLockImport>,
}

/// An imported module, with the fields glide writes plus cached
/// enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlideLockImport {
    #[serde(flatten)]
    pub requirement: GlideLockRequirement,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// The blob hash of a CHANGELOG.md in the repository, if present.
    #[serde(default, skip_serializing_if = "Hash::is_none")]
    pub changelog: Hash,
    /// The blob hash of a glide.lock in the repository, if present.
    #[serde(default, skip_serializing_if = "Hash::is_none")]
    pub glidelock: Hash,
    /// The blob hash of a Gopkg.lock in the repository, if present.
    #[serde(default, skip_serializing_if = "Hash::is_none")]
    pub deplock: Hash,
    #[serde(default, rename = "gitoliteMirror", skip_serializing_if = "std::ops::Not::not")]
    pub gitolite_mirror: bool,
    #[serde(
        default,
        rename = "gitoliteMirrorCreated",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub gitolite_mirror_created: bool,

    /// A cache of the lockfile provided by the dependency itself.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<GlideLockRequirement>,
    /// Neither glide.lock nor Gopkg.lock exists in the dependency.
    #[serde(default, rename = "noRequirements", skip_serializing_if = "std::ops::Not::not")]
    pub no_requirements: bool,

    /// All of the `main` packages in the module.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    /// All exported packages, with the module prefix included.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<String>,
    /// The imports of every package exported by this module.
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub imports: std::collections::BTreeMap<String, Vec<String>>,
    /// The test imports of every package exported by this module.
    #[serde(
        default,
        rename = "testImports",
        skip_serializing_if = "std::collections::BTreeMap::is_empty"
    )]
    pub test_imports: std::collections::BTreeMap<String, Vec<String>>,
}

/// The pinned identity of a module: the part of an import that recurs in
/// cached transitive requirements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlideLockRequirement {
    pub name: String,
    /// The cache key for the remote URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub root: String,
    /// The remote repository URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo: String,
    /// The commit hash of the locked dependency. Glide calls this the
    /// version.
    #[serde(default, skip_serializing_if = "Hash::is_none")]
    pub version: Hash,
    /// The normalized version number inferred from a tag, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revision: String,
    /// The best reference for the commit.
    #[serde(default, rename = "ref", skip_serializing_if = "String::is_empty")]
    pub reference: String,
    /// The committer timestamp of the commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// De-facto standard; must be "git" or absent.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vcs: String,
}

pub fn read_glide_lock(bytes: &[u8]) -> Result<GlideLock, LockfileError> {
    Ok(serde_yaml::from_slice(bytes)?)
}

pub fn write_glide_lock(lock: &GlideLock) -> Result<Vec<u8>, LockfileError> {
    Ok(serde_yaml::to_string(lock)?.into_bytes())
}

/// Convert a decoded glide.lock into modules, imports first, then test
/// imports.
pub fn modules_from_glide_lock(lock: &GlideLock) -> Result<Modules, LockfileError> {
    let mut modules = Modules::new();
    for import in &lock.imports {
        modules.push(module_from_import(import, false)?);
    }
    for import in &lock.test_imports {
        modules.push(module_from_import(import, true)?);
    }
    Ok(modules)
}

/// Convert modules into the glide.lock model, splitting test modules into
/// the testImports section.
pub fn glide_lock_from_modules(modules: &Modules) -> GlideLock {
    let mut imports = Vec::new();
    let mut test_imports = Vec::new();
    for module in modules {
        let import = import_from_module(module);
        if module.test {
            test_imports.push(import);
        } else {
            imports.push(import);
        }
    }
    GlideLock {
        generator: crate::STAMP.to_string(),
        imports,
        test_imports,
    }
}

fn module_from_import(import: &GlideLockImport, test: bool) -> Result<Module, LockfileError> {
    let requirement = &import.requirement;
    if !requirement.vcs.is_empty() && requirement.vcs != "git" {
        return Err(LockfileError::UnsupportedVcs(requirement.vcs.clone()));
    }

    let commands: StringSet = import.commands.iter().cloned().collect();
    let exports: StringSet = import.exports.iter().cloned().collect();
    let (imports, co_imports) = graphs_from_lists(&import.imports);
    let (test_import_graph, co_test_imports) = graphs_from_lists(&import.test_imports);

    let mut all = StringSet::new();
    all.include(&commands);
    all.include(&exports);
    all.include(&imports.source_set());
    all.include(&co_imports.source_set());
    all.include(&test_import_graph.source_set());
    all.include(&co_test_imports.source_set());

    Ok(Module {
        name: requirement.name.clone(),
        version: parse_version(&requirement.revision),
        hash: requirement.version,
        time: requirement.time,
        remote: requirement.repo.clone(),
        root: requirement.root.clone(),
        reference: requirement.reference.clone(),
        test,
        modules: import
            .requirements
            .iter()
            .map(module_from_requirement)
            .collect(),
        no_lock: import.no_requirements,
        warnings: import.warnings.clone(),
        changelog: import.changelog,
        glidelock: import.glidelock,
        deplock: import.deplock,
        gitolite_mirror: import.gitolite_mirror,
        gitolite_mirror_created: import.gitolite_mirror_created,
        packages: Packages {
            all,
            commands,
            exports,
            imports,
            test_imports: test_import_graph,
            co_imports,
            co_test_imports,
        },
        ..Module::default()
    })
}

fn import_from_module(module: &Module) -> GlideLockImport {
    GlideLockImport {
        requirement: requirement_from_module(module),
        warnings: module.warnings.clone(),
        changelog: module.changelog,
        glidelock: module.glidelock,
        deplock: module.deplock,
        gitolite_mirror: module.gitolite_mirror,
        gitolite_mirror_created: module.gitolite_mirror_created,
        requirements: module
            .modules
            .iter()
            .filter(|dep| !dep.test)
            .map(requirement_from_module)
            .collect(),
        no_requirements: module.no_lock,
        commands: module.packages.commands.keys(),
        exports: module.packages.exports.keys(),
        imports: lists_from_graph(&module.packages.imports),
        test_imports: lists_from_graph(&module.packages.test_imports),
    }
}

fn module_from_requirement(requirement: &GlideLockRequirement) -> Module {
    Module {
        name: requirement.name.clone(),
        version: parse_version(&requirement.revision),
        hash: requirement.version,
        time: requirement.time,
        remote: requirement.repo.clone(),
        root: requirement.root.clone(),
        reference: requirement.reference.clone(),
        ..Module::default()
    }
}

fn requirement_from_module(module: &Module) -> GlideLockRequirement {
    GlideLockRequirement {
        name: module.name.clone(),
        revision: module.version.to_string(),
        version: module.hash,
        time: module.time,
        repo: module.remote.clone(),
        root: module.root.clone(),
        reference: module.reference.clone(),
        vcs: String::new(),
    }
}

fn graphs_from_lists(
    lists: &std::collections::BTreeMap<String, Vec<String>>,
) -> (StringGraph, StringGraph) {
    let mut graph = StringGraph::new();
    let mut co_graph = StringGraph::new();
    for (key, values) in lists {
        for value in values {
            graph.add(key.clone(), value.clone());
            co_graph.add(value.clone(), key.clone());
        }
    }
    (graph, co_graph)
}

fn lists_from_graph(graph: &StringGraph) -> std::collections::BTreeMap<String, Vec<String>> {
    graph
        .iter()
        .map(|(src, tgts)| (src.to_string(), tgts.keys()))
        .collect()
}
