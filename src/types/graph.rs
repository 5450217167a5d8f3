//! A directed graph addressed by strings.
//!
//! Used for package import graphs and the solver's reverse dependency
//! table. Sources iterate in sorted order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::set::StringSet;

/// A directed graph whose vertexes are strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringGraph(BTreeMap<String, StringSet>);

impl StringGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add an edge from one vertex to another. Has no effect if the edge
    /// already exists.
    pub fn add(&mut self, src: impl Into<String>, tgt: impl Into<String>) {
        self.0.entry(src.into()).or_default().add(tgt);
    }

    /// The set of vertexes reachable by a single edge from the source.
    pub fn targets(&self, src: &str) -> Option<&StringSet> {
        self.0.get(src)
    }

    /// Whether there is an edge from one vertex to another.
    pub fn has(&self, src: &str, tgt: &str) -> bool {
        self.targets(src).is_some_and(|tgts| tgts.has(tgt))
    }

    /// Whether any edges depart from the given vertex.
    pub fn has_source(&self, src: &str) -> bool {
        self.0.contains_key(src)
    }

    /// Add all edges of another graph into this one.
    pub fn include(&mut self, other: &StringGraph) {
        for (src, tgts) in &other.0 {
            self.0.entry(src.clone()).or_default().include(tgts);
        }
    }

    /// The source vertexes, sorted.
    pub fn sources(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// The source vertexes as a set.
    pub fn source_set(&self) -> StringSet {
        self.0.keys().cloned().collect()
    }

    /// Whether any member of the set is a source vertex in this graph.
    pub fn intersects(&self, set: &StringSet) -> bool {
        set.iter().any(|s| self.0.contains_key(s))
    }

    /// The set of vertexes transitively reachable from the seed, including
    /// the seed itself. Breadth-first over forward edges.
    pub fn transitive(&self, seed: &StringSet) -> StringSet {
        let mut collection = seed.clone();
        let mut frontier: Vec<String> = seed.keys();
        while let Some(name) = frontier.pop() {
            if let Some(targets) = self.targets(&name) {
                for target in targets.iter() {
                    if !collection.has(target) {
                        collection.add(target);
                        frontier.push(target.to_string());
                    }
                }
            }
        }
        collection
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StringSet)> {
        self.0.iter().map(|(src, tgts)| (src.as_str(), tgts))
    }
}
