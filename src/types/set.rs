//! An ordered set of strings.
//!
//! Package paths, reference names, and directory excludes all live in these
//! sets. Iteration is sorted so every consumer is deterministic.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A set of strings with sorted iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringSet(BTreeSet<String>);

impl StringSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, s: &str) -> bool {
        self.0.contains(s)
    }

    pub fn add(&mut self, s: impl Into<String>) {
        self.0.insert(s.into());
    }

    pub fn remove(&mut self, s: &str) {
        self.0.remove(s);
    }

    /// Subsume another set into this one.
    pub fn include(&mut self, other: &StringSet) {
        for s in other.iter() {
            self.0.insert(s.to_string());
        }
    }

    /// Remove every member of another set from this one.
    pub fn exclude(&mut self, other: &StringSet) {
        for s in other.iter() {
            self.0.remove(s);
        }
    }

    /// A new set containing the members of both sets.
    pub fn union(&self, other: &StringSet) -> StringSet {
        let mut out = self.clone();
        out.include(other);
        out
    }

    /// Whether the sets have any member in common.
    pub fn intersects(&self, other: &StringSet) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|s| large.has(s))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The members in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for StringSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        StringSet(iter.into_iter().map(Into::into).collect())
    }
}
