//! vend - a dependency manager for Go-style package trees.
//!
//! Every fetched revision of every dependency lives in a bare git cache
//! under the working copy; a backtracking minimum-version solver picks one
//! revision per module; the result round-trips through glide.lock and a
//! vendor tree checkout.

pub mod analyze;
pub mod cancel;
pub mod cmd;
pub mod config;
pub mod core;
pub mod git;
pub mod loader;
pub mod lockfile;
pub mod ops;
pub mod solve;
pub mod types;
pub mod ui;
pub mod walk;

#[cfg(test)]
pub mod testutil;

/// The version of the vend command.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The generator stamp written into lockfiles.
pub const STAMP: &str = concat!("vend ", env!("CARGO_PKG_VERSION"));

/// The bare repository cache directory in the working copy.
pub const CACHE_DIR: &str = ".vend";
