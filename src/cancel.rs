//! Cooperative cancellation.
//!
//! A token is threaded through every loader, solver, and workflow entry
//! point; loops poll it between iterations and bail out promptly. There
//! are no ambient cancellation points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// A cancellation token, cheap to clone and safe to poll.
#[derive(Debug, Clone, Default)]
pub struct Cancel(Arc<AtomicBool>);

impl Cancel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; typically installed as a ctrl-c
    /// handler.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Return an error if cancellation has been requested, for use with
    /// `?` at the top of loop bodies.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check() {
        let cancel = Cancel::new();
        assert!(cancel.check().is_ok());
        cancel.cancel();
        assert!(cancel.is_cancelled());
        assert_eq!(cancel.check(), Err(Cancelled));
        // Clones share the flag.
        let clone = cancel.clone();
        assert!(clone.is_cancelled());
    }
}
