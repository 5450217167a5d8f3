//! Creation of hosted gitolite mirrors over SSH.

use std::process::{Command, Stdio};

use anyhow::{bail, Result};

use crate::ui::Progress;

/// Ask a gitolite host to create a mirror repository before the first
/// fetch. The mirror may already exist; failure is reported but not fatal.
pub fn create_mirror(out: &dyn Progress, mirror: &str) -> Result<()> {
    let status = format!("Attempting to create gitolite mirror (may already exist): {mirror}");
    out.start(&status);
    let result = create(mirror);
    out.stop(&status);
    if let Err(err) = &result {
        out.write(&format!(
            "Warning while attempting to create gitolite mirror: {err}\n"
        ));
    }
    Ok(())
}

fn create(mirror: &str) -> Result<()> {
    let Some((remote, path)) = mirror.split_once(':') else {
        bail!(
            "Remote location for gitolite mirror must have one colon to \
             separate remote from path: {mirror}"
        );
    };
    let output = Command::new("ssh")
        .args([remote, "create", path])
        .stdin(Stdio::null())
        .output()?;
    if !output.status.success() {
        bail!(
            "ssh {remote} create {path}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
