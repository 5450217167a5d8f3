//! The command layer: thin adapters between the CLI and the core.

pub mod add;
pub mod cache;
pub mod checkout;
pub mod fetch;
pub mod init;
pub mod missing;
pub mod prune;
pub mod remove;
pub mod show;
pub mod solve;
pub mod upgrade;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::cancel::Cancel;
use crate::core::module::Module;
use crate::loader::Memo;
use crate::lockfile;
use crate::solve::{SolverProgress, State};
use crate::ui::{Console, Progress};

/// Everything a command needs: the working directory, the session memo,
/// a cancellation token, and a progress sink.
pub struct Session {
    pub work_dir: PathBuf,
    pub memo: Memo,
    pub cancel: Cancel,
    pub out: Console,
}

impl Session {
    /// Open a session in the current directory, with GOPATH-style source
    /// roots from the environment.
    pub fn open(offline: bool) -> Result<Session> {
        let work_dir = std::env::current_dir().context("cannot determine working directory")?;
        let go_path = source_roots();
        let mut memo = Memo::new(&work_dir, go_path)?;
        memo.set_offline(offline);
        Ok(Session {
            work_dir,
            memo,
            cancel: Cancel::new(),
            out: Console::new(),
        })
    }

    /// Read the working copy's lockfile and solve its constraints.
    pub fn solve_own(&mut self) -> Result<Rc<State>> {
        let modules = self.memo.read_own_modules(&self.cancel, &self.out)?;
        let state = State::new()
            .constrain(&self.cancel, &mut self.memo, &self.out, modules, false)
            .map_err(|err| err.source)?;
        state
            .solve(&self.cancel, &mut self.memo, &self.out)
            .map_err(|err| err.source)
    }

    /// Write a solved state back to the working copy's lockfile.
    pub fn write(&self, state: &State) -> Result<()> {
        lockfile::write_own_modules(&self.work_dir, &state.modules())?;
        Ok(())
    }
}

/// The source roots to resolve the working copy's own package name:
/// `$GOPATH`, or `$HOME/go`.
fn source_roots() -> Vec<String> {
    if let Ok(go_path) = std::env::var("GOPATH") {
        return go_path
            .split(':')
            .filter(|root| !root.is_empty())
            .map(str::to_string)
            .collect();
    }
    dirs::home_dir()
        .map(|home| vec![home.join("go").to_string_lossy().to_string()])
        .unwrap_or_default()
}

impl SolverProgress for Console {
    fn show_state(&self, state: &State) {
        tracing::debug!(
            "solver state: {} unsolved, {} solved",
            state.frontier.len(),
            state.solution.len()
        );
    }

    fn constrain(&self, _state: &State, module: &Module) {
        tracing::debug!("constrain {}", module.summary());
    }

    fn backtrack(&self, _state: &State, prev: &Module, next: &Module) {
        self.write(&format!(
            "Backtracking to upgrade {} to {}\n",
            prev.summary(),
            next.summary()
        ));
    }
}
