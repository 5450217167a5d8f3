//! The prune workflow: drop modules nothing in the working copy needs.

use std::rc::Rc;

use anyhow::Result;

use crate::cancel::Cancel;
use crate::core::packages::Packages;
use crate::loader::WorkflowLoader;
use crate::ops::extra_modules;
use crate::solve::{SolverProgress, State};
use crate::ui::Progress;

/// Remove every module in the solution that is not necessary to build any
/// command or test in the working copy, together with the modules that
/// only those modules required.
pub fn prune(
    cancel: &Cancel,
    loader: &mut dyn WorkflowLoader,
    out: &dyn SolverProgress,
    state: Rc<State>,
    own_packages: &Packages,
) -> Result<Rc<State>> {
    let mut state = state;
    let mut modules = state.modules();
    loader.finish_packages(cancel, out as &dyn Progress, &mut modules)?;

    let extra = extra_modules(own_packages, &modules.packages(), &modules);
    for module in &extra {
        cancel.check()?;
        let solver: &mut dyn crate::loader::SolverLoader = &mut *loader;
        state = state.remove(cancel, solver, out, &module.name)?;
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use crate::core::module::{Module, Modules};
    use crate::testutil::{FakeLoader, LogProgress};

    use super::*;

    fn exporter(name: &str) -> Module {
        let mut module = Module::named(name);
        module.packages.export(name);
        module
    }

    #[test]
    fn test_prune_drops_unimported_modules() {
        let mut loader = FakeLoader::new(
            vec![exporter("example.com/blake"), exporter("example.com/carey")].into(),
        );
        let cancel = Cancel::new();
        let progress = LogProgress;

        let mut own = Packages::new();
        own.command("example.com/avery");
        own.import("example.com/avery", "example.com/blake");

        let give: Modules = vec![
            Module::named("example.com/blake"),
            Module::named("example.com/carey"),
        ]
        .into();
        let state = State::new()
            .constrain(&cancel, &mut loader, &progress, give, false)
            .unwrap()
            .solve(&cancel, &mut loader, &progress)
            .unwrap();

        let state = prune(&cancel, &mut loader, &progress, state, &own).unwrap();
        let names = state.modules().names();
        assert!(names.has("example.com/blake"));
        assert!(!names.has("example.com/carey"));
    }
}
