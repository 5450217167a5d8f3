//! Lockfile and manifest codecs.
//!
//! Each format is a pair of functions behind the same narrow interface:
//! decode bytes to modules, encode modules to bytes. The format is chosen
//! by filename at the call site; everything a format cannot carry is lost
//! on encode, and decoders tolerate missing fields.

pub mod dep;
pub mod glide;
pub mod manifest;

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::core::module::Modules;

pub use dep::{dep_lock_from_modules, modules_from_dep_lock, read_dep_lock, write_dep_lock};
pub use glide::{
    glide_lock_from_modules, modules_from_glide_lock, read_glide_lock, write_glide_lock,
};
pub use manifest::{
    glide_manifest_from_modules, modules_from_glide_manifest, read_glide_manifest,
    write_glide_manifest,
};

#[derive(Error, Debug)]
pub enum LockfileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("text encoding error: {0}")]
    Encoding(String),

    #[error("VCS must be empty or git, got {0:?}")]
    UnsupportedVcs(String),
}

/// Decode a lockfile by filename: `glide.lock` or `Gopkg.lock`.
pub fn decode_lockfile(name: &str, bytes: &[u8]) -> Result<Modules, LockfileError> {
    match name {
        "Gopkg.lock" => modules_from_dep_lock(&read_dep_lock(bytes)?),
        _ => modules_from_glide_lock(&read_glide_lock(bytes)?),
    }
}

/// Encode modules for a lockfile filename.
pub fn encode_lockfile(name: &str, modules: &Modules) -> Result<Vec<u8>, LockfileError> {
    match name {
        "Gopkg.lock" => write_dep_lock(&dep_lock_from_modules(modules)),
        _ => write_glide_lock(&glide_lock_from_modules(modules)),
    }
}

/// Read the working copy's lockfile: `glide.lock`, else `Gopkg.lock`, else
/// an empty module list.
pub fn read_own_modules(work_dir: &Path) -> Result<Modules, LockfileError> {
    for name in ["glide.lock", "Gopkg.lock"] {
        let path = work_dir.join(name);
        if path.exists() {
            let bytes = fs::read(&path)?;
            return decode_lockfile(name, &bytes);
        }
    }
    Ok(Modules::new())
}

/// Write the working copy's `glide.lock`.
pub fn write_own_modules(work_dir: &Path, modules: &Modules) -> Result<(), LockfileError> {
    let bytes = encode_lockfile("glide.lock", modules)?;
    fs::write(work_dir.join("glide.lock"), bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::core::module::Module;

    #[test]
    fn test_codec_chosen_by_filename() {
        let modules: Modules = vec![Module::named("example.com/avery")].into();
        let glide = encode_lockfile("glide.lock", &modules).unwrap();
        assert!(String::from_utf8(glide.clone()).unwrap().contains("imports:"));
        let dep = encode_lockfile("Gopkg.lock", &modules).unwrap();
        assert!(String::from_utf8(dep.clone()).unwrap().contains("[[projects]]"));

        assert!(decode_lockfile("glide.lock", &glide).unwrap().equal(&modules));
        assert!(decode_lockfile("Gopkg.lock", &dep).unwrap().equal(&modules));
    }

    #[test]
    fn test_own_modules_round_trip() {
        let dir = tempdir().unwrap();
        assert!(read_own_modules(dir.path()).unwrap().is_empty());

        let modules: Modules = vec![Module::named("example.com/avery")].into();
        write_own_modules(dir.path(), &modules).unwrap();
        let read = read_own_modules(dir.path()).unwrap();
        assert!(read.equal(&modules));
    }
}
