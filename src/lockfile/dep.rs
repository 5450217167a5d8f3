//! The Gopkg.lock codec.
//!
//! The dep format carries far less than glide.lock: a name, a revision,
//! an optional version or branch, and an optional source URL. Everything
//! else is lost on encode and rebuilt by the loader on decode.

use serde::{Deserialize, Serialize};

use crate::core::module::{Module, Modules};
use crate::lockfile::LockfileError;
use crate::types::{parse_version, Hash, NO_HASH, NO_VERSION};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepLock {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<DepProject>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepProject {
    pub name: String,
    /// The commit hash.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revision: String,
    /// A tag name like "v1.0.0", without the "tags/" prefix.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// A branch name like "feature", without the "heads/" prefix.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
    /// The remote repository URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
}

pub fn read_dep_lock(bytes: &[u8]) -> Result<DepLock, LockfileError> {
    Ok(toml::from_str(std::str::from_utf8(bytes).map_err(|err| {
        LockfileError::Encoding(err.to_string())
    })?)?)
}

pub fn write_dep_lock(lock: &DepLock) -> Result<Vec<u8>, LockfileError> {
    Ok(toml::to_string_pretty(lock)?.into_bytes())
}

pub fn modules_from_dep_lock(lock: &DepLock) -> Result<Modules, LockfileError> {
    Ok(lock.projects.iter().map(module_from_project).collect())
}

pub fn dep_lock_from_modules(modules: &Modules) -> DepLock {
    DepLock {
        projects: modules.iter().map(project_from_module).collect(),
    }
}

fn module_from_project(project: &DepProject) -> Module {
    let reference = if !project.version.is_empty() {
        format!("tags/{}", project.version)
    } else if !project.branch.is_empty() {
        format!("heads/{}", project.branch)
    } else {
        String::new()
    };
    Module {
        name: project.name.clone(),
        version: parse_version(&project.version),
        reference,
        hash: Hash::parse(&project.revision).unwrap_or(NO_HASH),
        remote: project.source.clone(),
        ..Module::default()
    }
}

fn project_from_module(module: &Module) -> DepProject {
    let mut version = String::new();
    let mut branch = String::new();
    if let Some(head) = module.reference.strip_prefix("heads/") {
        branch = head.to_string();
    } else if let Some(tag) = module.reference.strip_prefix("tags/") {
        version = tag.to_string();
    } else if module.version != NO_VERSION {
        version = format!("v{}", module.version);
    }
    DepProject {
        name: module.name.clone(),
        version,
        branch,
        revision: module.hash.to_hex(),
        source: module.remote.clone(),
    }
}
