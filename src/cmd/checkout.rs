//! `vend checkout`: materialize the solved modules under vendor/.

use anyhow::Result;

use crate::cmd::Session;

pub fn run(session: &mut Session) -> Result<()> {
    let state = session.solve_own()?;
    let modules = state.modules();
    session.memo.repo().checkout_modules(&session.out, &modules)?;
    println!("Checked out {} modules under vendor/.", modules.len());
    Ok(())
}
