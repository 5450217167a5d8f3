//! `vend show`: reports over the current solution.

use anyhow::Result;

use crate::cmd::Session;
use crate::loader::WorkflowLoader;
use crate::ops::{extra_modules, shallow_solution};

/// Print the full solution, one aligned row per module.
pub fn solution(session: &mut Session) -> Result<()> {
    let state = session.solve_own()?;
    for module in &state.modules() {
        println!("{module}");
        for warning in &module.warnings {
            println!("    warning: {warning}");
        }
    }
    Ok(())
}

/// Print the subset of the solution the working copy imports directly.
pub fn shallow(session: &mut Session) -> Result<()> {
    let (_, own) = session.memo.read_own_packages(&session.out)?;
    let state = session.solve_own()?;
    let mut modules = state.modules();
    session
        .memo
        .finish_packages(&session.cancel, &session.out, &mut modules)?;
    for module in &shallow_solution(&own, &modules) {
        println!("{module}");
    }
    Ok(())
}

/// Print the modules nothing in the working copy needs.
pub fn extra(session: &mut Session) -> Result<()> {
    let (_, own) = session.memo.read_own_packages(&session.out)?;
    let state = session.solve_own()?;
    let mut modules = state.modules();
    session
        .memo
        .finish_packages(&session.cancel, &session.out, &mut modules)?;
    for module in &extra_modules(&own, &modules.packages(), &modules) {
        println!("{module}");
    }
    Ok(())
}

/// Print the import and export graph of the working copy.
pub fn packages(session: &mut Session) -> Result<()> {
    let (name, own) = session.memo.read_own_packages(&session.out)?;
    println!("package {name}");
    for command in own.commands.iter() {
        println!("command {command}");
    }
    for export in own.exports.iter() {
        println!("export {export}");
    }
    for (src, imports) in own.imports.iter() {
        for import in imports.iter() {
            println!("import {src} -> {import}");
        }
    }
    Ok(())
}
