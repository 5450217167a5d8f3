//! `vend missing`: add modules that export packages the working copy
//! imports but nothing provides.

use anyhow::Result;

use crate::cmd::Session;
use crate::ops::add_missing;

pub fn run(session: &mut Session) -> Result<()> {
    let (name, packages) = session.memo.read_own_packages(&session.out)?;
    let state = session.solve_own()?;
    let recommended = session.memo.recommended().clone();
    let state = add_missing(
        &session.cancel,
        &mut session.memo,
        &session.out,
        state,
        &name,
        &packages,
        &recommended,
    )?;
    session.write(&state)
}
