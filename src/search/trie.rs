//! Prefix trie over the literal leading components of scope globs.
//!
//! Each glob is filed under the node reached by its wildcard-free prefix, so a
//! query path only needs to walk its own components to collect every pattern
//! whose glob could possibly match it. Globs that start with a wildcard live
//! on the root and are collected for every path.

use std::collections::{BTreeSet, HashMap};

use crate::core::paths;

#[derive(Debug, Default, Clone)]
struct TrieNode {
    children: HashMap<String, TrieNode>,
    positions: Vec<usize>,
}

#[derive(Debug, Default, Clone)]
pub struct PathTrie {
    root: TrieNode,
    globs: usize,
}

impl PathTrie {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, glob: &str, position: usize) {
        let mut node = &mut self.root;
        for segment in paths::literal_prefix(glob) {
            node = node.children.entry(segment.to_string()).or_default();
        }
        if node.positions.last() != Some(&position) {
            node.positions.push(position);
        }
        self.globs += 1;
    }

    /// Add every position whose glob prefix is a prefix of `path`.
    pub fn collect(&self, path: &str, out: &mut BTreeSet<usize>) {
        let mut node = &self.root;
        out.extend(node.positions.iter().copied());
        for segment in paths::segments(path) {
            let Some(next) = node.children.get(segment) else {
                return;
            };
            node = next;
            out.extend(node.positions.iter().copied());
        }
    }

    #[must_use]
    pub fn candidates_for(&self, paths: &[String]) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        for path in paths {
            self.collect(path, &mut out);
        }
        out
    }

    #[must_use]
    pub const fn glob_count(&self) -> usize {
        self.globs
    }
}
