//! The upgrade workflow: promote modules to newer compatible revisions.

use std::rc::Rc;

use anyhow::Result;
use chrono::Utc;

use crate::cancel::Cancel;
use crate::core::module::{Module, Modules};
use crate::loader::{SolverLoader, WorkflowLoader, FETCH_MAX_ATTEMPTS};
use crate::solve::{SolverProgress, State};
use crate::types::StringSet;
use crate::ui::Progress;

/// Promote every module in the solution to the newest revision it can
/// upgrade to: the latest version in its compatibility window, or a newer
/// commit on the same reference. A module is reviewed at most once, but
/// an upgrade that introduces new modules reopens the loop for them.
pub fn upgrade(
    cancel: &Cancel,
    loader: &mut dyn WorkflowLoader,
    out: &dyn SolverProgress,
    state: Rc<State>,
) -> Result<Rc<State>> {
    let start = Utc::now();
    let mut state = state;
    let mut reviewed = StringSet::new();
    let mut done = false;
    while !done {
        done = true;
        let modules = state.modules();
        for module in &modules {
            cancel.check()?;
            if reviewed.has(&module.name) {
                continue;
            }
            done = false;
            reviewed.add(module.name.clone());

            out.progress(
                "Upgrading",
                reviewed.len(),
                modules.len(),
                start,
                Utc::now(),
            );

            state = upgrade_module(cancel, loader, out, state, module.clone())?;
        }
    }
    Ok(state)
}

fn upgrade_module(
    cancel: &Cancel,
    loader: &mut dyn WorkflowLoader,
    out: &dyn SolverProgress,
    state: Rc<State>,
    mut module: Module,
) -> Result<Rc<State>> {
    let sink = out as &dyn Progress;
    if let Err(err) = loader.fetch(cancel, sink, &mut module, FETCH_MAX_ATTEMPTS) {
        sink.write(&format!(
            "warning while attempting to fetch {}: {err}\n",
            module.summary()
        ));
    }
    if let Err(err) = loader.digest_refs(cancel, sink, &module) {
        sink.write(&format!(
            "warning while attempting to digest references {}: {err}\n",
            module.summary()
        ));
    }

    let versions = loader.read_versions(cancel, sink, &module)?;
    let upgrade = find_upgrade_module(&versions, &module);
    if upgrade.equal(&module) {
        return Ok(state);
    }
    let solver: &mut dyn SolverLoader = &mut *loader;
    state.add(cancel, solver, out, upgrade)
}

/// The newest revision the module can upgrade to, or the module itself.
fn find_upgrade_module(versions: &Modules, module: &Module) -> Module {
    let mut module = module.clone();
    for upgrade in versions {
        if module.can_upgrade_to(upgrade) {
            module = upgrade.clone();
        }
    }
    module
}
