//! `vend prune`: drop modules no command or test needs.

use anyhow::Result;

use crate::cmd::Session;
use crate::ops::prune;

pub fn run(session: &mut Session) -> Result<()> {
    let (_, packages) = session.memo.read_own_packages(&session.out)?;
    let state = session.solve_own()?;
    let before = state.modules();
    let state = prune(
        &session.cancel,
        &mut session.memo,
        &session.out,
        state,
        &packages,
    )?;
    let after = state.modules().names();
    for module in &before {
        if !after.has(&module.name) {
            println!("- {}", module.summary());
        }
    }
    session.write(&state)
}
