//! Candidate generation: narrow the corpus to a bounded candidate set.
//!
//! Indices are built once per corpus load and only read afterwards, so one
//! generator can serve concurrent queries. Rebuilding means constructing a new
//! generator.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::core::{Corpus, PatternType, Signals};
use crate::scoring::scope::evaluate_entry;

use super::bloom::PathBloom;
use super::index::FacetIndex;
use super::trie::PathTrie;

/// Default survivor cap before coarse ranking kicks in.
pub const DEFAULT_CANDIDATE_CAP: usize = 1500;

/// Query paths at or above this count are screened through the per-pattern
/// bloom filter before glob matching.
pub const BLOOM_PATH_THRESHOLD: usize = 16;

/// Per-call generation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub accepted_types: Vec<PatternType>,
    pub candidate_cap: usize,
    /// Also require patterns to belong to the query's repository and
    /// organization (or declare none).
    pub strict_owner: bool,
}

impl Default for CandidateQuery {
    fn default() -> Self {
        Self {
            accepted_types: PatternType::ALL.to_vec(),
            candidate_cap: DEFAULT_CANDIDATE_CAP,
            strict_owner: false,
        }
    }
}

/// Counts from each narrowing step, for tracing and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub corpus: usize,
    pub after_facets: usize,
    pub after_paths: usize,
    pub returned: usize,
    /// Returned candidates that carry one of the query's tags.
    pub tagged: usize,
    pub coarse_ranked: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    /// Corpus positions, ascending.
    pub positions: Vec<usize>,
    pub stats: GenerationStats,
}

#[derive(Debug)]
pub struct CandidateGenerator {
    corpus: Arc<Corpus>,
    facets: FacetIndex,
    trie: PathTrie,
    blooms: Vec<Option<PathBloom>>,
}

impl CandidateGenerator {
    /// Build every index over `corpus`.
    #[must_use]
    pub fn build(corpus: Arc<Corpus>) -> Self {
        let facets = FacetIndex::build(&corpus);
        let mut trie = PathTrie::new();
        let mut blooms = Vec::with_capacity(corpus.len());
        for (pos, entry) in corpus.iter() {
            for glob in &entry.meta.scope.paths {
                trie.insert(glob, pos);
            }
            blooms.push(
                (!entry.meta.scope.paths.is_empty()).then(|| PathBloom::build(&entry.meta.scope.paths)),
            );
        }
        debug!(
            patterns = corpus.len(),
            globs = trie.glob_count(),
            "built candidate indices"
        );
        Self {
            corpus,
            facets,
            trie,
            blooms,
        }
    }

    #[must_use]
    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    #[must_use]
    pub const fn facets(&self) -> &FacetIndex {
        &self.facets
    }

    /// Run facet prefilter, path prefilter and (if needed) coarse ranking.
    /// `signals` must be normalized.
    #[must_use]
    pub fn generate(&self, signals: &Signals, query: &CandidateQuery) -> CandidateSet {
        let mut stats = GenerationStats {
            corpus: self.corpus.len(),
            ..GenerationStats::default()
        };

        let faceted = self.facet_prefilter(signals, query);
        stats.after_facets = faceted.len();

        let mut positions = self.path_prefilter(faceted, &signals.paths);
        stats.after_paths = positions.len();

        if positions.len() > query.candidate_cap {
            positions = self.coarse_rank(positions, signals, query.candidate_cap);
            stats.coarse_ranked = true;
        }
        stats.returned = positions.len();
        if !signals.tags.is_empty() {
            let tagged = self.facets.tagged_any(&signals.tags);
            stats.tagged = positions.iter().filter(|pos| tagged.contains(pos)).count();
        }

        debug!(
            corpus = stats.corpus,
            after_facets = stats.after_facets,
            after_paths = stats.after_paths,
            returned = stats.returned,
            tagged = stats.tagged,
            coarse_ranked = stats.coarse_ranked,
            "generated candidates"
        );
        CandidateSet { positions, stats }
    }

    fn facet_prefilter(&self, signals: &Signals, query: &CandidateQuery) -> BTreeSet<usize> {
        let mut set = self.facets.of_types(&query.accepted_types);

        if !signals.languages.is_empty() {
            let allowed = self.facets.language_permissive(&signals.languages);
            set.retain(|pos| allowed.contains(pos));
        }

        if !signals.frameworks.is_empty() {
            let allowed = self.facets.framework_permissive(&signals.frameworks);
            set.retain(|&pos| {
                allowed.contains(&pos)
                    && (self.facets.framework_undeclared(pos) || self.framework_version_ok(pos, signals))
            });
        }

        if query.strict_owner {
            if let Some(repo) = signals.repo.as_deref() {
                let allowed = self.facets.repo_permissive(repo);
                set.retain(|pos| allowed.contains(pos));
            }
            if let Some(org) = signals.org.as_deref() {
                let allowed = self.facets.org_permissive(org);
                set.retain(|pos| allowed.contains(pos));
            }
        }
        set
    }

    fn framework_version_ok(&self, pos: usize, signals: &Signals) -> bool {
        self.corpus.get(pos).is_some_and(|entry| {
            entry
                .meta
                .scope
                .frameworks
                .iter()
                .any(|req| signals.frameworks.iter().any(|fw| req.matches(fw)))
        })
    }

    fn path_prefilter(&self, positions: BTreeSet<usize>, paths: &[String]) -> Vec<usize> {
        if paths.is_empty() {
            return positions.into_iter().collect();
        }
        let reachable = self.trie.candidates_for(paths);
        let screen = paths.len() >= BLOOM_PATH_THRESHOLD;

        positions
            .into_iter()
            .filter(|&pos| {
                let Some(entry) = self.corpus.get(pos) else {
                    return false;
                };
                if entry.globs.is_empty() {
                    return true;
                }
                if !reachable.contains(&pos) {
                    return false;
                }
                let bloom = self.blooms.get(pos).and_then(Option::as_ref);
                paths
                    .iter()
                    .filter(|path| !screen || bloom.is_none_or(|b| b.may_match(path)))
                    .any(|path| entry.globs.iter().any(|g| g.matches(path)))
            })
            .collect()
    }

    /// Keep the `cap` survivors with the best unweighted scope points.
    fn coarse_rank(&self, positions: Vec<usize>, signals: &Signals, cap: usize) -> Vec<usize> {
        let mut scored: Vec<(usize, f64, f64)> = positions
            .into_iter()
            .filter_map(|pos| {
                self.corpus.get(pos).map(|entry| {
                    let eval = evaluate_entry(entry, signals);
                    (pos, eval.points, eval.raw)
                })
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| b.2.total_cmp(&a.2))
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(cap);
        let mut kept: Vec<usize> = scored.into_iter().map(|(pos, _, _)| pos).collect();
        kept.sort_unstable();
        kept
    }
}
