//! The add-missing workflow: find modules that export packages the
//! solution imports but nothing exports.

use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::Result;
use chrono::Utc;

use crate::cancel::Cancel;
use crate::core::module::Module;
use crate::core::packages::{missing_packages, Packages};
use crate::loader::{SolverLoader, WorkflowLoader};
use crate::solve::{SolverProgress, State};
use crate::types::{StringSet, Version, NO_VERSION};
use crate::ui::Progress;

/// The fetch attempt budget while probing candidate module names. Lower
/// than the default because misguessing a repository location is expected.
pub const ADD_MISSING_FETCH_MAX_ATTEMPTS: u32 = 2;

/// Repeatedly add the best module that exports a missing import, normal
/// imports first, then test imports, until nothing is missing or nothing
/// more can be found.
///
/// `own_name` is the working copy's root package, which is never proposed
/// as its own dependency. The best candidate is the most recent semantic
/// version, or failing that the master branch; configured recommendations
/// override. Candidate names are shortened one path component at a time
/// when a deep package path does not name a repository, unless the remote
/// came from a config pattern.
pub fn add_missing(
    cancel: &Cancel,
    loader: &mut dyn WorkflowLoader,
    out: &dyn SolverProgress,
    state: Rc<State>,
    own_name: &str,
    own_packages: &Packages,
    recommended: &BTreeMap<String, Version>,
) -> Result<Rc<State>> {
    let mut state = state;
    let mut tried = StringSet::new();
    out.start("Adding modules for missing packages");

    let mut max = 0;
    let start = Utc::now();

    loop {
        cancel.check()?;

        let mut modules = state.modules();
        loader.finish_packages(cancel, out as &dyn Progress, &mut modules)?;
        max = max.max(modules.packages().exports.len());
        let (imports, test_imports) = missing_packages(own_packages, &modules.packages());
        report_progress(out, &modules.packages(), &imports, &test_imports, max, start);
        if let Some(next) = add_one_missing_module(
            cancel,
            loader,
            out,
            &state,
            &mut tried,
            own_name,
            &imports,
            false,
            recommended,
        ) {
            state = next;
            continue;
        }

        let mut modules = state.modules();
        loader.finish_packages(cancel, out as &dyn Progress, &mut modules)?;
        max = max.max(modules.packages().exports.len());
        let (imports, test_imports) = missing_packages(own_packages, &modules.packages());
        report_progress(out, &modules.packages(), &imports, &test_imports, max, start);
        if let Some(next) = add_one_missing_module(
            cancel,
            loader,
            out,
            &state,
            &mut tried,
            own_name,
            &test_imports,
            true,
            recommended,
        ) {
            state = next;
            continue;
        }
        break;
    }

    out.stop("Adding modules for missing packages");
    Ok(state)
}

fn report_progress(
    out: &dyn SolverProgress,
    packages: &Packages,
    imports: &StringSet,
    test_imports: &StringSet,
    max: usize,
    start: chrono::DateTime<Utc>,
) {
    let missing = imports.union(test_imports).len();
    let tot = packages.exports.len().saturating_sub(max);
    let num = tot.saturating_sub(missing);
    out.progress(
        "Adding modules for missing packages",
        num,
        tot,
        start,
        Utc::now(),
    );
}

/// Advance one package forward from the set of missing packages,
/// returning the new state if a module was added.
#[allow(clippy::too_many_arguments)]
fn add_one_missing_module(
    cancel: &Cancel,
    loader: &mut dyn WorkflowLoader,
    out: &dyn SolverProgress,
    state: &Rc<State>,
    tried: &mut StringSet,
    own_name: &str,
    packages: &StringSet,
    test: bool,
    recommended: &BTreeMap<String, Version>,
) -> Option<Rc<State>> {
    let sink = out as &dyn Progress;

    'scan: for name in packages.keys() {
        if tried.has(&name) {
            continue;
        }
        tried.add(name.clone());
        sink.write(&format!("Searching for module to export package {name}.\n"));

        // Never propose the working copy to itself.
        if name == own_name || name.starts_with(&format!("{own_name}/")) {
            continue;
        }

        let mut parts: Vec<&str> = name.split('/').collect();

        // Skip any package that a module already in the state should
        // export.
        for i in (0..parts.len()).rev() {
            let short = parts[..i].join("/");
            if let Some(&index) = state.problem.get(&short) {
                sink.write(&format!(
                    "* Package {name} should be exported by module {}.\n",
                    state.frontier[index].name
                ));
                continue 'scan;
            }
            if let Some(partial) = state.solution.get(&short) {
                sink.write(&format!(
                    "* Package {name} should be exported by module {}.\n",
                    partial.module.name
                ));
                continue 'scan;
            }
        }

        while parts.len() >= 2 {
            let candidate = parts.join("/");
            let mut module = Module {
                name: candidate.clone(),
                test,
                ..Module::default()
            };
            if let Err(err) = loader.finish_remote(cancel, sink, &mut module) {
                sink.write(&format!(
                    "Error while finding remote for {}: {err}\n",
                    module.name
                ));
            }
            if let Err(err) =
                loader.fetch(cancel, sink, &mut module, ADD_MISSING_FETCH_MAX_ATTEMPTS)
            {
                sink.write(&format!(
                    "Error while fetching versions for {}: {err}\n",
                    module.name
                ));
            }
            if let Err(err) = loader.digest_refs(cancel, sink, &module) {
                sink.write(&format!(
                    "Error while digesting references for {}: {err}\n",
                    module.name
                ));
            }
            let versions = match loader.read_versions(cancel, sink, &module) {
                Ok(versions) => versions,
                Err(err) => {
                    sink.write(&format!(
                        "Error while reading versions for {}: {err}\n",
                        module.name
                    ));
                    continue 'scan;
                }
            };

            let add = match recommended.get(&module.name) {
                Some(&version) if version != NO_VERSION => {
                    versions.find_version(version).cloned()
                }
                _ => versions.find_best_version().cloned(),
            };

            if let Some(add) = add {
                let solver: &mut dyn SolverLoader = &mut *loader;
                match state.add(cancel, solver, out, add.clone()) {
                    Ok(next) => {
                        sink.write(&format!("+ {add}\n"));
                        return Some(next);
                    }
                    Err(err) => {
                        sink.write(&format!("{err}\n"));
                        return Some(Rc::clone(state));
                    }
                }
            }

            if module.exact_remote {
                continue 'scan;
            }

            sink.write(&format!(
                "Could not find a suitable version for {candidate}.\n"
            ));
            parts.pop();
            if parts.len() >= 2 {
                sink.write(&format!(
                    "Trying a shorter package name: {}.\n",
                    parts.join("/")
                ));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeLoader, LogProgress};
    use crate::core::module::Modules;

    fn avery_packages() -> Packages {
        let mut packages = Packages::new();
        packages.export("example.com/avery");
        packages.import("example.com/avery", "net/http");
        packages.import("example.com/avery", "time");
        packages.import("example.com/avery", "example.com/blake");
        packages.import("example.com/avery", "example.com/carey");
        packages.test_import("example.com/avery", "example.com/carey");
        packages.test_import("example.com/avery", "example.com/drew/drewutil");
        packages.command("example.com/avery/cmd/avery");
        packages.import("example.com/avery/cmd/avery", "example.com/avery");
        packages
    }

    fn blake_packages() -> Packages {
        let mut packages = Packages::new();
        packages.export("example.com/blake");
        // A command in a dependency must stay out of the missing set.
        packages.command("example.com/blake/cmd/blake");
        packages
    }

    fn carey_packages() -> Packages {
        let mut packages = Packages::new();
        packages.export("example.com/carey");
        packages.import("example.com/carey", "example.com/carey/internal/carey");
        packages.import("example.com/carey/internal/carey", "example.com/carey");
        packages
    }

    fn drew_packages() -> Packages {
        let mut packages = Packages::new();
        packages.export("example.com/drew/drewutil");
        packages.import("example.com/drew/drewutil", "example.com/carey");
        packages.import("example.com/drew/drewutil", "example.com/bogus");
        packages
    }

    #[test]
    fn test_add_missing_chooses_recommended_and_best_versions() {
        let mut loader = FakeLoader::new(
            vec![
                Module {
                    name: "example.com/blake".to_string(),
                    version: Version::new(1, 0, 0),
                    packages: blake_packages(),
                    ..Module::default()
                },
                Module {
                    name: "example.com/blake".to_string(),
                    version: Version::new(2, 0, 0),
                    packages: blake_packages(),
                    ..Module::default()
                },
                Module {
                    name: "example.com/carey".to_string(),
                    version: Version::new(1, 0, 0),
                    packages: carey_packages(),
                    ..Module::default()
                },
                Module {
                    name: "example.com/drew".to_string(),
                    reference: "heads/master".to_string(),
                    packages: drew_packages(),
                    ..Module::default()
                },
            ]
            .into(),
        );
        let cancel = Cancel::new();
        let progress = LogProgress;

        let mut recommended = BTreeMap::new();
        recommended.insert("example.com/blake".to_string(), Version::new(1, 0, 0));

        let state = add_missing(
            &cancel,
            &mut loader,
            &progress,
            State::new(),
            "example.com/avery",
            &avery_packages(),
            &recommended,
        )
        .unwrap();

        let mut want: Modules = vec![
            Module {
                name: "example.com/blake".to_string(),
                version: Version::new(1, 0, 0),
                ..Module::default()
            },
            Module {
                name: "example.com/carey".to_string(),
                version: Version::new(1, 0, 0),
                ..Module::default()
            },
            Module {
                name: "example.com/drew".to_string(),
                reference: "heads/master".to_string(),
                test: true,
                ..Module::default()
            },
        ]
        .into();
        loader
            .finish_modules(&cancel, &progress, &mut want)
            .unwrap();

        let got = state.modules();
        assert!(
            want.equal(&got),
            "want {} got {}",
            want.summaries(),
            got.summaries()
        );
    }

    #[test]
    fn test_add_missing_favors_non_test() {
        let mut loader = FakeLoader::new(
            vec![
                Module {
                    name: "example.com/blake".to_string(),
                    reference: "heads/master".to_string(),
                    ..Module::default()
                },
                Module {
                    name: "example.com/carey".to_string(),
                    reference: "heads/master".to_string(),
                    ..Module::default()
                },
            ]
            .into(),
        );
        let cancel = Cancel::new();
        let progress = LogProgress;

        let mut own = Packages::new();
        own.command("example.com/avery");
        own.import("example.com/avery", "example.com/blake");
        own.import("example.com/avery", "example.com/carey/command");
        own.test_import("example.com/avery", "example.com/carey/test");

        let state = add_missing(
            &cancel,
            &mut loader,
            &progress,
            State::new(),
            "example.com/avery",
            &own,
            &BTreeMap::new(),
        )
        .unwrap();

        let mut want: Modules = vec![
            Module::named("example.com/blake"),
            Module::named("example.com/carey"),
        ]
        .into();
        loader
            .finish_modules(&cancel, &progress, &mut want)
            .unwrap();

        let got = state.modules();
        assert!(
            want.equal(&got),
            "want {} got {}",
            want.summaries(),
            got.summaries()
        );
        assert!(got.iter().all(|module| !module.test));
    }

    #[test]
    fn test_add_missing_never_proposes_the_working_copy() {
        let mut loader = FakeLoader::new(Modules::new());
        let cancel = Cancel::new();
        let progress = LogProgress;

        let mut own = Packages::new();
        own.command("example.com/avery");
        own.import("example.com/avery", "example.com/avery/sub");

        let state = add_missing(
            &cancel,
            &mut loader,
            &progress,
            State::new(),
            "example.com/avery",
            &own,
            &BTreeMap::new(),
        )
        .unwrap();
        assert!(state.modules().is_empty());
    }
}
