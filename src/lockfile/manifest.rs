//! The glide.yaml manifest codec.
//!
//! Manifests carry shallow dependencies with semver range predicates
//! rather than pins; the loader resolves a range to a concrete revision
//! with the best qualifying version.

use serde::{Deserialize, Serialize};

use crate::core::module::{Module, Modules};
use crate::lockfile::LockfileError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlideManifest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license: String,
    #[serde(default, rename = "import", skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<GlideManifestImport>,
    #[serde(default, rename = "testImport", skip_serializing_if = "Vec::is_empty")]
    pub test_imports: Vec<GlideManifestImport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlideManifestImport {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package: String,
    /// A branch name, hash, or semver predicate like "^1.2.0".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo: String,
}

pub fn read_glide_manifest(bytes: &[u8]) -> Result<GlideManifest, LockfileError> {
    Ok(serde_yaml::from_slice(bytes)?)
}

pub fn write_glide_manifest(manifest: &GlideManifest) -> Result<Vec<u8>, LockfileError> {
    Ok(serde_yaml::to_string(manifest)?.into_bytes())
}

/// Render modules as a shallow manifest: versions become conservative
/// semver ranges, branch references become branch names.
pub fn glide_manifest_from_modules(modules: &Modules) -> GlideManifest {
    let mut imports = Vec::new();
    let mut test_imports = Vec::new();
    for module in modules {
        let version = if !module.version.is_none() {
            if module.version.0[0] == 0 {
                format!("~{}", module.version)
            } else {
                format!("^{}", module.version)
            }
        } else if let Some(head) = module.reference.strip_prefix("heads/") {
            head.to_string()
        } else {
            String::new()
        };
        let import = GlideManifestImport {
            package: module.name.clone(),
            version,
            repo: module.remote.clone(),
        };
        if module.test {
            test_imports.push(import);
        } else {
            imports.push(import);
        }
    }
    GlideManifest {
        imports,
        test_imports,
        ..GlideManifest::default()
    }
}

/// Decode a manifest into sparse modules carrying only names, remotes, and
/// the version predicate for the loader to resolve.
pub fn modules_from_glide_manifest(manifest: &GlideManifest) -> Vec<(Module, String)> {
    let mut modules = Vec::new();
    for (imports, test) in [(&manifest.imports, false), (&manifest.test_imports, true)] {
        for import in imports {
            let module = Module {
                name: import.package.clone(),
                remote: import.repo.clone(),
                test,
                ..Module::default()
            };
            modules.push((module, import.version.clone()));
        }
    }
    modules
}
