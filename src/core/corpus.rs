//! Immutable corpus snapshot shared by candidate generation and scoring.

use std::collections::HashMap;

use super::paths::{PathGlob, compile_all};
use super::pattern::PatternMeta;

/// One pattern plus its precompiled scope globs.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub meta: PatternMeta,
    pub globs: Vec<PathGlob>,
}

/// Read-only view of every `PatternMeta`, addressed by position.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
    positions: HashMap<String, usize>,
}

impl Corpus {
    #[must_use]
    pub fn new(metas: Vec<PatternMeta>) -> Self {
        let mut positions = HashMap::with_capacity(metas.len());
        let entries = metas
            .into_iter()
            .enumerate()
            .map(|(pos, meta)| {
                positions.insert(meta.id.clone(), pos);
                let globs = compile_all(&meta.scope.paths);
                CorpusEntry { meta, globs }
            })
            .collect();
        Self { entries, positions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, pos: usize) -> Option<&CorpusEntry> {
        self.entries.get(pos)
    }

    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &CorpusEntry)> {
        self.entries.iter().enumerate()
    }
}
