//! `vend remove`: remove modules and their dependees from the solution.

use anyhow::Result;

use crate::cmd::Session;

pub fn run(session: &mut Session, names: &[String]) -> Result<()> {
    let mut state = session.solve_own()?;
    for name in names {
        state = state.remove(&session.cancel, &mut session.memo, &session.out, name)?;
        println!("- {name}");
    }
    session.write(&state)
}
