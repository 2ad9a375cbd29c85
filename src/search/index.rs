//! Inverted facet indices over corpus positions.
//!
//! Six facets are indexed: type, language, framework, tag, repository and
//! organization. Alongside each facet map the index keeps the set of
//! positions that declare nothing for that facet, so permissive filters
//! ("matching or undeclared") are a single union.

use std::collections::{BTreeSet, HashMap};

use crate::core::{Corpus, FrameworkSignal, PatternType};

#[derive(Debug, Default, Clone)]
struct Facet {
    values: HashMap<String, BTreeSet<usize>>,
    undeclared: BTreeSet<usize>,
}

impl Facet {
    fn add<'a>(&mut self, position: usize, values: impl IntoIterator<Item = &'a str>) {
        let mut any = false;
        for value in values {
            any = true;
            self.values
                .entry(value.to_lowercase())
                .or_default()
                .insert(position);
        }
        if !any {
            self.undeclared.insert(position);
        }
    }

    fn get(&self, value: &str) -> Option<&BTreeSet<usize>> {
        self.values.get(&value.to_lowercase())
    }

    /// Undeclared positions plus those holding any of `values`.
    fn permissive<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> BTreeSet<usize> {
        let mut out = self.undeclared.clone();
        for value in values {
            if let Some(hits) = self.get(value) {
                out.extend(hits.iter().copied());
            }
        }
        out
    }
}

#[derive(Debug, Default, Clone)]
pub struct FacetIndex {
    by_type: HashMap<PatternType, BTreeSet<usize>>,
    language: Facet,
    framework: Facet,
    tag: Facet,
    repo: Facet,
    org: Facet,
}

impl FacetIndex {
    #[must_use]
    pub fn build(corpus: &Corpus) -> Self {
        let mut index = Self::default();
        for (pos, entry) in corpus.iter() {
            let meta = &entry.meta;
            index.by_type.entry(meta.kind).or_default().insert(pos);
            index
                .language
                .add(pos, meta.scope.languages.iter().map(String::as_str));
            index
                .framework
                .add(pos, meta.scope.frameworks.iter().map(|f| f.name.as_str()));
            index.tag.add(pos, meta.tags.iter().map(String::as_str));
            index.repo.add(pos, meta.metadata.repo.as_deref());
            index.org.add(pos, meta.metadata.org.as_deref());
        }
        index
    }

    /// Union of the positions of every accepted type.
    #[must_use]
    pub fn of_types(&self, types: &[PatternType]) -> BTreeSet<usize> {
        types
            .iter()
            .filter_map(|t| self.by_type.get(t))
            .flat_map(|set| set.iter().copied())
            .collect()
    }

    /// Positions declaring one of `languages`, or no language at all.
    #[must_use]
    pub fn language_permissive(&self, languages: &[String]) -> BTreeSet<usize> {
        self.language.permissive(languages.iter().map(String::as_str))
    }

    /// Positions declaring no framework, or a framework named in `frameworks`.
    /// Version ranges are checked by the caller.
    #[must_use]
    pub fn framework_permissive(&self, frameworks: &[FrameworkSignal]) -> BTreeSet<usize> {
        self.framework
            .permissive(frameworks.iter().map(|f| f.name.as_str()))
    }

    #[must_use]
    pub fn framework_undeclared(&self, position: usize) -> bool {
        self.framework.undeclared.contains(&position)
    }

    #[must_use]
    pub fn repo_permissive(&self, repo: &str) -> BTreeSet<usize> {
        self.repo.permissive([repo])
    }

    #[must_use]
    pub fn org_permissive(&self, org: &str) -> BTreeSet<usize> {
        self.org.permissive([org])
    }

    /// Positions carrying at least one of `tags`. Tags never filter; this
    /// only reports how many survivors the query's tags can lift.
    #[must_use]
    pub fn tagged_any(&self, tags: &[String]) -> BTreeSet<usize> {
        tags.iter()
            .filter_map(|tag| self.tag.get(tag))
            .flat_map(|set| set.iter().copied())
            .collect()
    }
}
