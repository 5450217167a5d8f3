//! `vend upgrade`: promote modules to newer compatible revisions.

use anyhow::Result;

use crate::cmd::Session;
use crate::ops::upgrade;

pub fn run(session: &mut Session) -> Result<()> {
    let state = session.solve_own()?;
    let state = upgrade(&session.cancel, &mut session.memo, &session.out, state)?;
    session.write(&state)?;
    for module in &state.modules() {
        println!("{module}");
    }
    Ok(())
}
