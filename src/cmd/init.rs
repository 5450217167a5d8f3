//! `vend init`: create the bare repository cache and an empty lockfile.

use anyhow::Result;

use crate::cmd::Session;
use crate::core::module::Modules;
use crate::lockfile;

pub fn run(session: &mut Session) -> Result<()> {
    // Opening the session already created the cache.
    if !session.work_dir.join("glide.lock").exists() {
        lockfile::write_own_modules(&session.work_dir, &Modules::new())?;
        println!("Wrote an empty glide.lock.");
    }
    println!(
        "Initialized the dependency cache in {}.",
        session.memo.repo().git_dir().display()
    );
    Ok(())
}
