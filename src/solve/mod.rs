//! The dependency constraint solver and its state snapshots.
//!
//! The algorithm works like a proof by contradiction. The initial state
//! has a "problem", also called the "frontier": an ordered list of modules
//! that must appear in the solution at some minimum version. The solver
//! "considers" moving one frontier module at a time into the solution,
//! keeping a pointer to the prior state so it can back-track if a
//! constraint discovered later invalidates the assumption that the chosen
//! version suffices.
//!
//! Considering a version examines each of that version's own minimum
//! version constraints. A constraint may add a new module to the problem,
//! upgrade a version already in the problem, or invalidate a module
//! already in the solution. In the last case the solver rewinds to the
//! snapshot taken just before the stale choice was committed, puts the
//! newer version in its slot, and reapplies the constraints accumulated
//! since, strictly advancing the solution toward newer versions.
//!
//! The solver also tracks which modules are needed only for tests. A
//! dependency of a test dependency is implicitly a test dependency, and a
//! test module demotes to a normal module, as if it were an older version,
//! the moment any non-test path requires it.
//!
//! The solver is finished when it reaches a state with an empty frontier.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use anyhow::Result;
use chrono::Utc;

use crate::cancel::Cancel;
use crate::core::module::{Module, Modules};
use crate::loader::SolverLoader;
use crate::types::{StringGraph, StringSet};
use crate::ui::Progress;

/// Progress notifications specific to the solver.
pub trait SolverProgress: Progress {
    /// The solver entered a new state.
    fn show_state(&self, state: &State);

    /// A constraint is being merged.
    fn constrain(&self, state: &State, module: &Module);

    /// A committed choice was invalidated; the solver is rewinding.
    fn backtrack(&self, state: &State, prev: &Module, next: &Module);
}

/// A solver failure carrying the partial state, so no accumulated
/// constraint is lost with it.
#[derive(Debug)]
pub struct SolveError {
    pub state: Rc<State>,
    pub source: anyhow::Error,
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.source.fmt(f)
    }
}

impl std::error::Error for SolveError {}

/// A module committed to the solution, paired with the state to rewind to
/// if the module must later be replaced by a newer version.
#[derive(Debug, Clone)]
pub struct Partial {
    pub module: Module,
    pub back: Rc<State>,
}

/// A state of the constraint solver. States are immutable snapshots; every
/// operation returns a new state sharing unmodified substructure with its
/// predecessor, and the back-pointers in solution entries form a DAG of
/// historical states.
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Modules to visit, in order, until the frontier is empty.
    pub frontier: Modules,
    /// An index of the frontier by package name.
    pub problem: BTreeMap<String, usize>,
    /// Modules being considered for the completed solution. The shallow
    /// constraints of every module here are already accounted for in the
    /// frontier or the solution.
    pub solution: BTreeMap<String, Partial>,
    /// A reverse lookup from a module to the modules that depend on it,
    /// needed to remove a package together with its transitive dependees.
    pub dependees: StringGraph,
}

impl State {
    /// An empty initial state.
    pub fn new() -> Rc<State> {
        Rc::new(State::default())
    }

    /// Whether either the frontier or the solution has a module with the
    /// given name.
    pub fn has(&self, name: &str) -> bool {
        self.problem.contains_key(name) || self.solution.contains_key(name)
    }

    /// All modules from the solution and the unsolved frontier, in
    /// canonical order, suitable for reconstructing a lockfile even from a
    /// partial solution.
    pub fn modules(&self) -> Modules {
        let mut modules = Modules::new();
        for partial in self.solution.values() {
            modules.push(partial.module.clone());
        }
        for module in &self.frontier {
            modules.push(module.clone());
        }
        modules.sort();
        modules
    }

    /// Assume the given module will be in the solution: remove it from the
    /// frontier, record it in the solution with a back-pointer to this
    /// state, and index its dependencies. An empty name is a plain clone.
    pub fn consider(self: &Rc<Self>, choice: Module) -> Rc<State> {
        let mut frontier = Modules::new();
        let mut problem = BTreeMap::new();
        for module in &self.frontier {
            if module.name != choice.name {
                problem.insert(module.name.clone(), frontier.len());
                frontier.push(module.clone());
            }
        }

        let mut solution: BTreeMap<String, Partial> = self
            .solution
            .iter()
            .filter(|(name, _)| **name != choice.name)
            .map(|(name, partial)| (name.clone(), partial.clone()))
            .collect();

        let mut dependees = self.dependees.clone();

        if !choice.name.is_empty() {
            for dependency in &choice.modules {
                dependees.add(dependency.name.clone(), choice.name.clone());
            }
            solution.insert(
                choice.name.clone(),
                Partial {
                    module: choice,
                    back: Rc::clone(self),
                },
            );
        }

        Rc::new(State {
            frontier,
            problem,
            solution,
            dependees,
        })
    }

    /// Add a module and retroactively plant it in the original frontier,
    /// so that a version of the module survives even if the solver
    /// back-tracks to a state prior to the lock.
    fn lock(self: &Rc<Self>, choice: Module) -> Rc<State> {
        let mut frontier = Modules::new();
        let mut problem = BTreeMap::new();
        let mut solution = BTreeMap::new();
        let dependees = self.dependees.clone();
        let mut added = false;

        for module in &self.frontier {
            if module.name == choice.name {
                if choice.before(module) {
                    problem.insert(module.name.clone(), frontier.len());
                    frontier.push(module.clone());
                    added = true;
                }
            } else {
                problem.insert(module.name.clone(), frontier.len());
                frontier.push(module.clone());
            }
        }

        for (name, partial) in &self.solution {
            let module = &partial.module;
            if module.name == choice.name {
                if choice.before(module) {
                    problem.insert(module.name.clone(), frontier.len());
                    frontier.push(module.clone());
                    added = true;
                }
            } else {
                // Re-parent every back-pointer so backtracking can never
                // forget the locked choice.
                solution.insert(
                    name.clone(),
                    Partial {
                        module: partial.module.clone(),
                        back: partial.back.consider(choice.clone()),
                    },
                );
            }
        }

        if !added {
            problem.insert(choice.name.clone(), frontier.len());
            frontier.push(choice);
        }

        Rc::new(State {
            frontier,
            problem,
            solution,
            dependees,
        })
    }

    /// Merge the given modules into the state as minimum version
    /// constraints, back-tracking to upgrade any module already committed
    /// to the solution at an older version.
    pub fn constrain(
        self: &Rc<Self>,
        cancel: &Cancel,
        loader: &mut dyn SolverLoader,
        out: &dyn SolverProgress,
        mut modules: Modules,
        test: bool,
    ) -> Result<Rc<State>, SolveError> {
        let mut state = Rc::clone(self);

        if let Err(source) = loader.finish_modules(cancel, out as &dyn Progress, &mut modules) {
            return Err(SolveError { state, source });
        }

        // Back-track for any module that we have already considered for
        // the solution but must upgrade, forgetting the transitive
        // consequences of the stale choice.
        for module in &modules {
            out.constrain(&state, module);
            if let Some(partial) = state.solution.get(&module.name) {
                if partial.module.before(module) {
                    out.backtrack(&state, &partial.module, module);
                    let back = Rc::clone(&partial.back);
                    state = back.consider(module.clone());
                }
            }
        }

        // Merge all modules into the frontier.
        let mut work = (*state).clone();
        for module in modules {
            let mut module = module;
            if test {
                module.test = true;
            }
            if let Some(&index) = work.problem.get(&module.name) {
                let mut entry = work.frontier[index].clone();
                // A module required by any non-test path is a normal
                // module.
                if !module.test {
                    entry.test = false;
                }
                // Promote to the higher or newer of the two versions.
                if entry.before(&module) {
                    let test = entry.test && module.test;
                    entry = module;
                    entry.test = test;
                }
                work.frontier[index] = entry;
            } else {
                let known = work.solution.get_mut(&module.name);
                match known {
                    Some(partial) => {
                        if !module.test {
                            partial.module.test = false;
                        }
                        if partial.module.before(&module) {
                            // The committed version is stale; re-enqueue
                            // the newer one.
                            work.solution.remove(&module.name);
                            work.problem.insert(module.name.clone(), work.frontier.len());
                            work.frontier.push(module);
                        }
                    }
                    None => {
                        work.problem.insert(module.name.clone(), work.frontier.len());
                        work.frontier.push(module);
                    }
                }
            }
        }

        Ok(Rc::new(work))
    }

    /// Drain the frontier into the solution: consider each module in
    /// order and merge its constraints, until the frontier is empty.
    pub fn solve(
        self: &Rc<Self>,
        cancel: &Cancel,
        loader: &mut dyn SolverLoader,
        out: &dyn SolverProgress,
    ) -> Result<Rc<State>, SolveError> {
        let start = Utc::now();
        let mut state = Rc::clone(self);

        while let Some(consider) = state.frontier.first().cloned() {
            if let Err(cancelled) = cancel.check() {
                return Err(SolveError {
                    state,
                    source: cancelled.into(),
                });
            }
            out.show_state(&state);

            let status = format!("Considering {}", consider.summary());
            out.start(&status);
            state = state.consider(consider.clone());
            let constrained =
                state.constrain(cancel, loader, out, consider.modules.clone(), consider.test);
            out.stop(&status);

            state = constrained?;
            let num = state.solution.len();
            let den = state.frontier.len() + num;
            out.progress("Solving dependency graph", num, den, start, Utc::now());
        }
        out.show_state(&state);
        Ok(state)
    }

    /// Add a single constraint and re-run the solver to completion.
    pub fn add(
        self: &Rc<Self>,
        cancel: &Cancel,
        loader: &mut dyn SolverLoader,
        out: &dyn SolverProgress,
        mut module: Module,
    ) -> Result<Rc<State>> {
        loader.finish_module(cancel, out as &dyn Progress, &mut module)?;
        self.lock(module)
            .solve(cancel, loader, out)
            .map_err(|err| err.source)
    }

    /// Remove a module and every module that transitively depends on it,
    /// then re-solve from the surviving constraints. Transitive
    /// dependencies of the removed subtree are deliberately retained:
    /// other modules in the working copy may still need them.
    pub fn remove(
        self: &Rc<Self>,
        cancel: &Cancel,
        loader: &mut dyn SolverLoader,
        out: &dyn SolverProgress,
        name: &str,
    ) -> Result<Rc<State>> {
        // Pre-solve so the dependees table is complete and the frontier is
        // empty.
        let state = self
            .solve(cancel, loader, out)
            .map_err(|err| err.source)?;

        let mut seed = StringSet::new();
        seed.add(name);
        let dependees = state.dependees.transitive(&seed);

        let mut constraints = Modules::new();
        for partial in state.solution.values() {
            if !dependees.has(&partial.module.name) {
                constraints.push(partial.module.clone());
            }
        }

        let state = State::new()
            .constrain(cancel, loader, out, constraints, false)
            .map_err(|err| err.source)?;
        state.solve(cancel, loader, out).map_err(|err| err.source)
    }
}

impl SolverProgress for crate::ui::Discard {
    fn show_state(&self, _state: &State) {}
    fn constrain(&self, _state: &State, _module: &Module) {}
    fn backtrack(&self, _state: &State, _prev: &Module, _next: &Module) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeLoader, LogProgress};
    use crate::types::Version;

    fn versioned(name: &str, version: Version) -> Module {
        Module {
            name: name.to_string(),
            version,
            ..Module::default()
        }
    }

    fn depends(name: &str, modules: Vec<Module>) -> Module {
        Module {
            name: name.to_string(),
            modules: modules.into(),
            ..Module::default()
        }
    }

    fn universe() -> FakeLoader {
        FakeLoader::new(
            vec![
                Module::named("avery"),
                depends("blake", vec![versioned("carey", Version::new(1, 0, 0))]),
                versioned("carey", Version::new(1, 0, 0)),
                versioned("carey", Version::new(2, 0, 0)),
                depends("drew", vec![versioned("carey", Version::new(2, 0, 0))]),
                depends(
                    "evelyn",
                    vec![
                        Module::named("finley"),
                        Module {
                            name: "gayle".to_string(),
                            test: true,
                            ..Module::default()
                        },
                    ],
                ),
                depends("finley", vec![Module::named("gayle")]),
                Module::named("gayle"),
                depends(
                    "harley",
                    vec![
                        versioned("carey", Version::new(1, 0, 0)),
                        versioned("carey", Version::new(2, 0, 0)),
                    ],
                ),
                depends(
                    "irene",
                    vec![
                        versioned("carey", Version::new(1, 0, 0)),
                        Module::named("jamie"),
                        Module::named("kelly"),
                    ],
                ),
                depends("jamie", vec![versioned("carey", Version::new(1, 0, 0))]),
                depends("kelly", vec![versioned("carey", Version::new(2, 0, 0))]),
                depends(
                    "leslie",
                    vec![Module {
                        name: "morgan".to_string(),
                        test: true,
                        ..Module::default()
                    }],
                ),
                depends("morgan", vec![versioned("carey", Version::new(1, 0, 0))]),
                depends(
                    "nancy",
                    vec![
                        Module::named("leslie"),
                        versioned("carey", Version::new(1, 0, 0)),
                    ],
                ),
            ]
            .into(),
        )
    }

    fn solve_constraints(loader: &mut FakeLoader, give: Modules) -> Rc<State> {
        let cancel = Cancel::new();
        let progress = LogProgress;
        State::new()
            .constrain(&cancel, loader, &progress, give, false)
            .unwrap()
            .solve(&cancel, loader, &progress)
            .unwrap()
    }

    fn check(give: Vec<Module>, want: Vec<Module>) {
        let mut loader = universe();
        let state = solve_constraints(&mut loader, give.into());
        let cancel = Cancel::new();
        let progress = LogProgress;
        let mut want: Modules = want.into();
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
    fn test_solve_nothing() {
        check(vec![], vec![]);
    }

    #[test]
    fn test_solve_independent_modules() {
        check(
            vec![Module::named("avery"), Module::named("blake")],
            vec![
                Module::named("avery"),
                Module::named("blake"),
                versioned("carey", Version::new(1, 0, 0)),
            ],
        );
    }

    #[test]
    fn test_solve_entrains_a_dependency() {
        check(
            vec![Module::named("blake")],
            vec![
                Module::named("blake"),
                versioned("carey", Version::new(1, 0, 0)),
            ],
        );
    }

    #[test]
    fn test_solve_uses_newest_of_shared_dependencies() {
        check(
            vec![Module::named("blake"), Module::named("drew")],
            vec![
                Module::named("blake"),
                versioned("carey", Version::new(2, 0, 0)),
                Module::named("drew"),
            ],
        );
    }

    #[test]
    fn test_solve_retains_a_test_dependency() {
        let test_gayle = Module {
            name: "gayle".to_string(),
            test: true,
            ..Module::default()
        };
        check(vec![test_gayle.clone()], vec![test_gayle]);
    }

    #[test]
    fn test_solve_promotes_a_test_dependency() {
        let test_gayle = Module {
            name: "gayle".to_string(),
            test: true,
            ..Module::default()
        };
        check(
            vec![test_gayle, Module::named("gayle")],
            vec![Module::named("gayle")],
        );
    }

    #[test]
    fn test_solve_promotes_test_dependencies_of_promoted_modules() {
        check(
            vec![Module::named("evelyn")],
            vec![
                Module::named("evelyn"),
                Module::named("finley"),
                Module::named("gayle"),
            ],
        );
    }

    #[test]
    fn test_solve_reconstrains_double_dependency() {
        check(
            vec![Module::named("harley")],
            vec![
                versioned("carey", Version::new(2, 0, 0)),
                Module::named("harley"),
            ],
        );
    }

    #[test]
    fn test_solve_backtracks_to_upgrade() {
        check(
            vec![Module::named("irene")],
            vec![
                versioned("carey", Version::new(2, 0, 0)),
                Module::named("irene"),
                Module::named("jamie"),
                Module::named("kelly"),
            ],
        );
    }

    #[test]
    fn test_solve_marks_dependency_of_test_as_test() {
        let mut test_carey = versioned("carey", Version::new(1, 0, 0));
        test_carey.test = true;
        let test_morgan = Module {
            name: "morgan".to_string(),
            test: true,
            ..Module::default()
        };
        check(
            vec![Module::named("leslie")],
            vec![test_carey, Module::named("leslie"), test_morgan],
        );
    }

    #[test]
    fn test_solve_promotes_dependency_of_test_dependency() {
        let test_morgan = Module {
            name: "morgan".to_string(),
            test: true,
            ..Module::default()
        };
        check(
            vec![Module::named("nancy")],
            vec![
                versioned("carey", Version::new(1, 0, 0)),
                Module::named("leslie"),
                test_morgan,
                Module::named("nancy"),
            ],
        );
    }

    #[test]
    fn test_constrain_then_has() {
        let mut loader = universe();
        let cancel = Cancel::new();
        let progress = LogProgress;
        let state = State::new()
            .constrain(
                &cancel,
                &mut loader,
                &progress,
                vec![Module::named("avery")].into(),
                false,
            )
            .unwrap();
        assert!(state.has("avery"));
        assert!(!state.has("blake"));
    }

    #[test]
    fn test_solve_is_fixed_point() {
        let mut loader = universe();
        let cancel = Cancel::new();
        let progress = LogProgress;
        let state = solve_constraints(&mut loader, vec![Module::named("irene")].into());
        let again = state.solve(&cancel, &mut loader, &progress).unwrap();
        assert!(state.modules().equal(&again.modules()));
    }

    #[test]
    fn test_solve_order_independent() {
        let mut loader = universe();
        let forward = solve_constraints(
            &mut loader,
            vec![Module::named("blake"), Module::named("drew")].into(),
        );
        let backward = solve_constraints(
            &mut loader,
            vec![Module::named("drew"), Module::named("blake")].into(),
        );
        assert!(forward.modules().equal(&backward.modules()));
        assert_eq!(
            forward.modules().summaries(),
            backward.modules().summaries()
        );
    }

    #[test]
    fn test_add_promotes_and_demotes_test_flag() {
        let mut loader = FakeLoader::new(vec![Module::named("avery")].into());
        let cancel = Cancel::new();
        let progress = LogProgress;

        let mut avery_test = Module::named("avery");
        avery_test.test = true;
        let state = State::new()
            .add(&cancel, &mut loader, &progress, avery_test)
            .unwrap();
        let want: Modules = vec![loader.must_get_test_version("avery", Version::default())].into();
        assert!(want.equal(&state.modules()));
        assert!(state.modules()[0].test);

        let state = state
            .add(&cancel, &mut loader, &progress, Module::named("avery"))
            .unwrap();
        let want: Modules = vec![loader.must_get_version("avery", Version::default())].into();
        assert!(want.equal(&state.modules()));
        assert!(!state.modules()[0].test);
    }

    #[test]
    fn test_remove_keeps_unrelated_module() {
        let mut loader = FakeLoader::new(
            vec![
                Module::named("avery"),
                Module::named("blake"),
                depends("carey", vec![Module::named("drew")]),
                Module::named("drew"),
            ]
            .into(),
        );
        let cancel = Cancel::new();
        let progress = LogProgress;

        let state = solve_constraints(
            &mut loader,
            vec![Module::named("avery"), Module::named("blake")].into(),
        );
        let state = state
            .remove(&cancel, &mut loader, &progress, "blake")
            .unwrap();
        let want: Modules = vec![loader.must_get_version("avery", Version::default())].into();
        assert!(want.equal(&state.modules()));
        assert!(!state.has("blake"));
    }

    #[test]
    fn test_remove_from_the_frontier() {
        let mut loader = FakeLoader::new(
            vec![Module::named("avery"), Module::named("blake")].into(),
        );
        let cancel = Cancel::new();
        let progress = LogProgress;

        let state = State::new()
            .constrain(
                &cancel,
                &mut loader,
                &progress,
                vec![Module::named("avery"), Module::named("blake")].into(),
                false,
            )
            .unwrap();
        let state = state
            .remove(&cancel, &mut loader, &progress, "blake")
            .unwrap();
        let want: Modules = vec![loader.must_get_version("avery", Version::default())].into();
        assert!(want.equal(&state.modules()));
    }

    #[test]
    fn test_remove_takes_dependees_along() {
        let mut loader = FakeLoader::new(
            vec![
                Module::named("avery"),
                Module::named("blake"),
                depends("carey", vec![Module::named("drew")]),
                Module::named("drew"),
            ]
            .into(),
        );
        let cancel = Cancel::new();
        let progress = LogProgress;

        let state = solve_constraints(
            &mut loader,
            vec![
                Module::named("avery"),
                Module::named("blake"),
                Module::named("carey"),
            ]
            .into(),
        );
        // Removing drew also removes carey, which depends upon it.
        let state = state.remove(&cancel, &mut loader, &progress, "drew").unwrap();
        let want: Modules = vec![
            loader.must_get_version("avery", Version::default()),
            loader.must_get_version("blake", Version::default()),
        ]
        .into();
        assert!(
            want.equal(&state.modules()),
            "want {} got {}",
            want.summaries(),
            state.modules().summaries()
        );
        // No surviving module names the removed one.
        for module in &state.modules() {
            assert!(!module.modules.names().has("drew"));
        }
    }
}
