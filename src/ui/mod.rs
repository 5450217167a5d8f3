//! Progress reporting for long-running workflows.
//!
//! The trait keeps the loader and solver decoupled from any particular
//! terminal rendering; commands install a console sink, tests a discard or
//! log sink.

use std::cell::Cell;
use std::io::Write;

use chrono::{DateTime, Utc};
use crossterm::style::Stylize;

/// The minimum milliseconds between progress notifications.
const PROGRESS_BETWEEN_MS: i64 = 1000;

/// A sink for workflow status: free-form warnings, start/stop section
/// markers, and ratio progress updates.
pub trait Progress {
    /// Write a free-form message, usually a warning.
    fn write(&self, msg: &str);

    /// A section of work has started.
    fn start(&self, msg: &str);

    /// A section of work has finished.
    fn stop(&self, msg: &str);

    /// A ratio progress update with timing, for estimated completion.
    fn progress(&self, msg: &str, num: usize, tot: usize, start: DateTime<Utc>, now: DateTime<Utc>);
}

/// A sink that reports nothing.
pub struct Discard;

impl Progress for Discard {
    fn write(&self, _msg: &str) {}
    fn start(&self, _msg: &str) {}
    fn stop(&self, _msg: &str) {}
    fn progress(
        &self,
        _msg: &str,
        _num: usize,
        _tot: usize,
        _start: DateTime<Utc>,
        _now: DateTime<Utc>,
    ) {
    }
}

/// A sink that prints sections and debounced progress ratios to stderr.
pub struct Console {
    last: Cell<Option<DateTime<Utc>>>,
}

impl Console {
    pub fn new() -> Self {
        Console {
            last: Cell::new(None),
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for Console {
    fn write(&self, msg: &str) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(msg.as_bytes());
    }

    fn start(&self, msg: &str) {
        eprintln!("{} {msg}", "::".dark_grey());
    }

    fn stop(&self, _msg: &str) {}

    fn progress(&self, msg: &str, num: usize, tot: usize, start: DateTime<Utc>, now: DateTime<Utc>) {
        if let Some(last) = self.last.get() {
            if (now - last).num_milliseconds() < PROGRESS_BETWEEN_MS {
                return;
            }
        }
        self.last.set(Some(now));
        let elapsed = (now - start).num_seconds();
        if tot > 0 {
            eprintln!(
                "{} {msg} {num}/{tot} ({elapsed}s)",
                "::".dark_grey()
            );
        }
    }
}
