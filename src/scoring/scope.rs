//! Scope scorer: overlap between declared scope and query signals.
//!
//! Each scope dimension (paths, languages, frameworks, tags) is *active* only
//! when both the pattern declares something and the query supplies something.
//! Points are the mean match ratio over active dimensions. A pattern with no
//! active dimension is neither rewarded nor penalized and sits at
//! [`NEUTRAL_SCOPE`].

use crate::core::{CorpusEntry, PathGlob, PatternMeta, Signals, paths::compile_all};

use super::ScoreComponent;

/// Points for a pattern whose scope is not comparable with the query.
pub const NEUTRAL_SCOPE: f64 = 0.5;

/// Any path hit is worth at least this much; the remainder scales with the
/// share of query paths covered.
const PATH_HIT_FLOOR: f64 = 0.6;

/// Full scope evaluation. `matched` is true when no active dimension came up
/// empty, which is what the policy bonus keys off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopeEvaluation {
    pub points: f64,
    /// Count of matched items across every dimension.
    pub raw: f64,
    pub matched: bool,
    pub active_dimensions: usize,
}

impl ScopeEvaluation {
    #[must_use]
    pub const fn component(&self) -> ScoreComponent {
        ScoreComponent::new(self.points, self.raw)
    }
}

/// Evaluate with precompiled globs. `signals` must already be normalized.
#[must_use]
pub fn evaluate_scope(meta: &PatternMeta, globs: &[PathGlob], signals: &Signals) -> ScopeEvaluation {
    let mut ratios: Vec<f64> = Vec::with_capacity(4);
    let mut raw = 0usize;

    if !globs.is_empty() && !signals.paths.is_empty() {
        let hits = signals
            .paths
            .iter()
            .filter(|path| globs.iter().any(|g| g.matches(path)))
            .count();
        raw += hits;
        ratios.push(if hits == 0 {
            0.0
        } else {
            PATH_HIT_FLOOR + (1.0 - PATH_HIT_FLOOR) * ratio(hits, signals.paths.len())
        });
    }

    if !meta.scope.languages.is_empty() && !signals.languages.is_empty() {
        let hits = meta
            .scope
            .languages
            .iter()
            .filter(|lang| signals.languages.iter().any(|s| s.eq_ignore_ascii_case(lang)))
            .count();
        raw += hits;
        ratios.push(overlap_ratio(hits, meta.scope.languages.len(), signals.languages.len()));
    }

    if !meta.scope.frameworks.is_empty() && !signals.frameworks.is_empty() {
        let hits = meta
            .scope
            .frameworks
            .iter()
            .filter(|req| signals.frameworks.iter().any(|fw| req.matches(fw)))
            .count();
        raw += hits;
        ratios.push(overlap_ratio(hits, meta.scope.frameworks.len(), signals.frameworks.len()));
    }

    if !meta.tags.is_empty() && !signals.tags.is_empty() {
        let hits = meta
            .tags
            .iter()
            .filter(|tag| signals.tags.iter().any(|s| s.eq_ignore_ascii_case(tag)))
            .count();
        raw += hits;
        ratios.push(overlap_ratio(hits, meta.tags.len(), signals.tags.len()));
    }

    let active_dimensions = ratios.len();
    #[allow(clippy::cast_precision_loss)]
    let (points, raw) = if active_dimensions == 0 {
        (NEUTRAL_SCOPE, raw as f64)
    } else {
        (
            ratios.iter().sum::<f64>() / active_dimensions as f64,
            raw as f64,
        )
    };

    ScopeEvaluation {
        points,
        raw,
        matched: ratios.iter().all(|r| *r > 0.0),
        active_dimensions,
    }
}

#[must_use]
pub fn evaluate_entry(entry: &CorpusEntry, signals: &Signals) -> ScopeEvaluation {
    evaluate_scope(&entry.meta, &entry.globs, signals)
}

/// Convenience form that compiles the pattern's globs on the spot.
#[must_use]
pub fn score_scope(meta: &PatternMeta, signals: &Signals) -> ScoreComponent {
    let globs = compile_all(&meta.scope.paths);
    evaluate_scope(meta, &globs, &signals.normalized()).component()
}

#[allow(clippy::cast_precision_loss)]
fn ratio(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

fn overlap_ratio(hits: usize, declared: usize, queried: usize) -> f64 {
    ratio(hits, declared.min(queried)).min(1.0)
}
