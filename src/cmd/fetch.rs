//! `vend fetch`: sync module repositories into the cache.

use anyhow::Result;

use crate::cmd::Session;
use crate::core::module::Module;
use crate::loader::{WorkflowLoader, FETCH_MAX_ATTEMPTS};

pub fn run(session: &mut Session, names: &[String]) -> Result<()> {
    for name in names {
        let mut module = Module::named(name.clone());
        session
            .memo
            .finish_remote(&session.cancel, &session.out, &mut module)?;
        session.memo.fetch(
            &session.cancel,
            &session.out,
            &mut module,
            FETCH_MAX_ATTEMPTS,
        )?;
        println!("Fetched {} from {}", module.name, module.remote);
    }
    Ok(())
}
