//! Test doubles shared across solver and workflow tests.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::cancel::Cancel;
use crate::core::module::{Module, Modules};
use crate::loader::{SolverLoader, WorkflowLoader};
use crate::solve::{SolverProgress, State};
use crate::types::{Hash, Version};
use crate::ui::Progress;

/// An in-memory loader over a fixed universe of modules, keyed by a
/// deterministic pseudo-hash of name, version, and time.
pub struct FakeLoader {
    known: BTreeMap<Hash, Module>,
}

/// A stand-in commit hash derived from the identifying fields, so sparse
/// test modules resolve to their enriched counterparts.
pub fn loader_hash(module: &Module) -> Hash {
    let seed = format!(
        "{}@{}@{}",
        module.name,
        module.version,
        module.time.map(|time| time.timestamp()).unwrap_or_default()
    );
    let digest = Sha256::digest(seed.as_bytes());
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&digest[..20]);
    Hash(hash)
}

impl FakeLoader {
    pub fn new(modules: Modules) -> Self {
        let mut known = BTreeMap::new();
        for mut module in modules {
            module.hash = loader_hash(&module);
            known.insert(module.hash, module);
        }
        FakeLoader { known }
    }

    /// The enriched module with the given name and version, for expected
    /// values in assertions.
    pub fn must_get_version(&self, name: &str, version: Version) -> Module {
        let probe = Module {
            name: name.to_string(),
            version,
            ..Module::default()
        };
        let mut module = self.known[&loader_hash(&probe)].clone();
        module.finished = true;
        module
    }

    /// Like `must_get_version` with the test flag set.
    pub fn must_get_test_version(&self, name: &str, version: Version) -> Module {
        let mut module = self.must_get_version(name, version);
        module.test = true;
        module
    }

    /// The module with the given name and timestamp.
    pub fn must_get_time(&self, name: &str, time: DateTime<Utc>) -> Module {
        self.known
            .values()
            .find(|module| module.name == name && module.time == Some(time))
            .cloned()
            .unwrap_or_default()
    }
}

impl SolverLoader for FakeLoader {
    fn finish_module(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        module: &mut Module,
    ) -> Result<()> {
        module.hash = loader_hash(module);
        let Some(known) = self.known.get(&module.hash).cloned() else {
            bail!("could not fetch module {}", module.summary());
        };
        let test = module.test;
        *module = known;
        module.test = test;
        module.finished = true;
        let mut dependencies = module.modules.clone();
        self.finish_modules(cancel, out, &mut dependencies)?;
        module.modules = dependencies;
        Ok(())
    }

    fn finish_modules(
        &mut self,
        cancel: &Cancel,
        out: &dyn Progress,
        modules: &mut [Module],
    ) -> Result<()> {
        for module in modules.iter_mut() {
            cancel.check()?;
            if module.finished {
                continue;
            }
            self.finish_module(cancel, out, module)?;
        }
        Ok(())
    }
}

impl WorkflowLoader for FakeLoader {
    fn finish_remote(
        &mut self,
        _cancel: &Cancel,
        _out: &dyn Progress,
        _module: &mut Module,
    ) -> Result<()> {
        Ok(())
    }

    fn fetch(
        &mut self,
        _cancel: &Cancel,
        _out: &dyn Progress,
        _module: &mut Module,
        _max_attempts: u32,
    ) -> Result<()> {
        Ok(())
    }

    fn digest_refs(&mut self, _cancel: &Cancel, _out: &dyn Progress, _module: &Module) -> Result<()> {
        Ok(())
    }

    fn finish_packages(
        &mut self,
        _cancel: &Cancel,
        _out: &dyn Progress,
        _modules: &mut [Module],
    ) -> Result<()> {
        Ok(())
    }

    fn read_versions(
        &mut self,
        _cancel: &Cancel,
        _out: &dyn Progress,
        module: &Module,
    ) -> Result<Modules> {
        let mut versions = Modules::new();
        for version in self.known.values() {
            if version.name == module.name {
                let mut version = version.clone();
                if module.test {
                    version.test = true;
                }
                versions.push(version);
            }
        }
        versions.sort();
        Ok(versions)
    }
}

/// A progress sink that logs solver events to stderr for failing-test
/// forensics.
pub struct LogProgress;

impl Progress for LogProgress {
    fn write(&self, msg: &str) {
        eprint!("{msg}");
    }

    fn start(&self, _msg: &str) {}

    fn stop(&self, _msg: &str) {}

    fn progress(
        &self,
        _msg: &str,
        _num: usize,
        _tot: usize,
        _start: DateTime<Utc>,
        _now: DateTime<Utc>,
    ) {
    }
}

impl SolverProgress for LogProgress {
    fn show_state(&self, state: &State) {
        let unlocked = state.frontier.summaries();
        let locked: Modules = state
            .solution
            .values()
            .map(|partial| partial.module.clone())
            .collect();
        eprintln!("Unlocked {unlocked} Locked {}", locked.summaries());
    }

    fn constrain(&self, _state: &State, module: &Module) {
        eprintln!("Constrain +{}", module.summary());
    }

    fn backtrack(&self, _state: &State, prev: &Module, next: &Module) {
        eprintln!("Backtrack -{} +{}", prev.summary(), next.summary());
    }
}
