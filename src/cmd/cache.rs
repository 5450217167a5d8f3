//! `vend pull` and `vend push`: mirror the vendor reference namespace
//! to and from the shared cache repository.

use anyhow::{bail, Result};

use crate::cmd::Session;

fn cache_url(session: &Session) -> Result<String> {
    let url = session.memo.vendor_cache().to_string();
    if url.is_empty() {
        bail!("no cache repository is configured in vend.toml");
    }
    Ok(url)
}

pub fn pull(session: &mut Session) -> Result<()> {
    let url = cache_url(session)?;
    session.memo.repo().pull_vendor_cache(&url)?;
    println!("Pulled vendor references from {url}.");
    Ok(())
}

pub fn push(session: &mut Session) -> Result<()> {
    let url = cache_url(session)?;
    session.memo.repo().push_vendor_cache(&url)?;
    println!("Pushed vendor references to {url}.");
    Ok(())
}
