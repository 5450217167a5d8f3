//! The vend.toml configuration file.
//!
//! Configuration is searched for in the working directory and every
//! ancestor; the nearest file wins. It carries the shared vendor cache
//! URL, remote location patterns, recommended versions for the add-missing
//! workflow, and extra directory names to exclude from the working copy.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::patterns::{Pattern, Patterns};
use crate::types::{parse_version, StringSet, Version};

pub const CONFIG_FILE: &str = "vend.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error in {CONFIG_FILE}: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// The git URL of a repository that serves as a shared refs/vendor
    /// cache.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cache: String,

    /// Remote location overrides for module names matching a pattern.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remotes: Vec<ConfigRemote>,

    /// Version overrides for the add-missing workflow.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<ConfigPackage>,

    /// Extra directory names to ignore while scanning the working copy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<ConfigExclude>,
}

/// A remote repository location pattern, matched against module names
/// instead of going to the web.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigRemote {
    /// A glob-like module name pattern: `*` matches one path component,
    /// `...` any suffix.
    pub pattern: String,
    /// The corresponding remote location, with matching wildcard
    /// components carried over.
    pub remote: String,
    /// The remote is a gitolite mirror and may need an ssh create before
    /// the first fetch.
    #[serde(default, rename = "gitoliteMirror", skip_serializing_if = "std::ops::Not::not")]
    pub gitolite_mirror: bool,
}

/// The version to prefer when the add-missing workflow introduces a
/// module. The default is the newest version, or failing that, master.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPackage {
    pub package: String,
    /// A version number like "1" or "v1.2.3".
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigExclude {
    pub path: String,
}

impl Config {
    pub fn parse(bytes: &[u8]) -> Result<Config, ConfigError> {
        let text = String::from_utf8_lossy(bytes);
        Ok(toml::from_str(&text)?)
    }

    /// Read the configuration from the working directory or the nearest
    /// ancestor that has one. Absent configuration is an empty config.
    pub fn read(work_dir: &Path) -> Result<Config, ConfigError> {
        let mut dir = Some(PathBuf::from(work_dir));
        while let Some(current) = dir {
            let path = current.join(CONFIG_FILE);
            match std::fs::read(&path) {
                Ok(bytes) => return Config::parse(&bytes),
                Err(_) => dir = current.parent().map(PathBuf::from),
            }
        }
        Ok(Config::default())
    }

    /// The remote patterns, in rule order.
    pub fn patterns(&self) -> Patterns {
        Patterns::new(
            self.remotes
                .iter()
                .map(|remote| Pattern::new(&remote.pattern, &remote.remote))
                .collect(),
        )
    }

    /// The rule indexes whose remotes are gitolite mirrors.
    pub fn mirror_rules(&self) -> std::collections::BTreeSet<usize> {
        self.remotes
            .iter()
            .enumerate()
            .filter(|(_, remote)| remote.gitolite_mirror)
            .map(|(rule, _)| rule)
            .collect()
    }

    /// Recommended versions by package name.
    pub fn recommended(&self) -> BTreeMap<String, Version> {
        self.packages
            .iter()
            .map(|package| (package.package.clone(), parse_version(&package.version)))
            .collect()
    }

    /// Directory names to exclude from working copy scans.
    pub fn excludes(&self) -> StringSet {
        self.excludes.iter().map(|exclude| exclude.path.clone()).collect()
    }
}
