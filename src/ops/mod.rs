//! Workflows that drive the solver: adding missing modules, pruning
//! unnecessary ones, and upgrading to newer revisions.

pub mod missing;
pub mod prune;
pub mod upgrade;

use crate::core::module::Modules;
use crate::core::packages::{necessary_packages, Packages};

pub use missing::add_missing;
pub use prune::prune;
pub use upgrade::upgrade;

/// The modules in a solution whose exports are not needed to build any
/// command or test in the working copy.
pub fn extra_modules(own: &Packages, packages: &Packages, modules: &Modules) -> Modules {
    let mut packages = packages.clone();
    packages.include(own);
    let (mut imports, test_imports) = necessary_packages(own, &packages);
    imports.include(&test_imports);
    modules
        .iter()
        .filter(|module| !module.packages.exports.intersects(&imports))
        .cloned()
        .collect()
}

/// The subset of a solution that the working copy imports directly: the
/// modules a manifest file would name.
pub fn shallow_solution(own: &Packages, modules: &Modules) -> Modules {
    modules
        .iter()
        .filter(|module| {
            own.co_imports.intersects(&module.packages.exports)
                || own.co_test_imports.intersects(&module.packages.exports)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module::Module;

    fn exporter(name: &str) -> Module {
        let mut module = Module::named(name);
        module.packages.export(name);
        module
    }

    #[test]
    fn test_extra_modules() {
        let mut own = Packages::new();
        own.command("example.com/avery");
        own.import("example.com/avery", "example.com/blake");

        let modules: Modules = vec![
            exporter("example.com/blake"),
            exporter("example.com/carey"),
        ]
        .into();

        let extra = extra_modules(&own, &modules.packages(), &modules);
        assert_eq!(extra.len(), 1);
        assert_eq!(extra[0].name, "example.com/carey");
    }

    #[test]
    fn test_extra_modules_keeps_transitive() {
        let mut own = Packages::new();
        own.command("example.com/avery");
        own.import("example.com/avery", "example.com/blake");

        let mut blake = exporter("example.com/blake");
        blake
            .packages
            .import("example.com/blake", "example.com/carey");
        let modules: Modules = vec![blake, exporter("example.com/carey")].into();

        let extra = extra_modules(&own, &modules.packages(), &modules);
        assert!(extra.is_empty());
    }

    #[test]
    fn test_shallow_solution() {
        let mut own = Packages::new();
        own.command("example.com/avery");
        own.import("example.com/avery", "example.com/blake");
        own.test_import("example.com/avery", "example.com/drew");

        let mut blake = exporter("example.com/blake");
        blake
            .packages
            .import("example.com/blake", "example.com/carey");
        let modules: Modules = vec![
            blake,
            exporter("example.com/carey"),
            exporter("example.com/drew"),
        ]
        .into();

        let shallow = shallow_solution(&own, &modules);
        let names: Vec<&str> = shallow.iter().map(|module| module.name.as_str()).collect();
        assert_eq!(names, ["example.com/blake", "example.com/drew"]);
    }
}
