//! `vend solve`: solve the lockfile's constraints and write the result.

use anyhow::Result;

use crate::cmd::Session;

pub fn run(session: &mut Session) -> Result<()> {
    let state = session.solve_own()?;
    session.write(&state)?;
    for module in &state.modules() {
        println!("{module}");
    }
    Ok(())
}
