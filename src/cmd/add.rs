//! `vend add`: add modules to the solution by spec.

use anyhow::Result;

use crate::cmd::Session;

pub fn run(session: &mut Session, specs: &[String], test: bool) -> Result<()> {
    let mut state = session.solve_own()?;
    for spec in specs {
        let module = session
            .memo
            .find_module(&session.cancel, &session.out, spec, test)?;
        println!("+ {module}");
        state = state.add(&session.cancel, &mut session.memo, &session.out, module)?;
    }
    session.write(&state)
}
