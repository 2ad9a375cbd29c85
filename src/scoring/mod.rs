//! Relevance scoring
//!
//! Four independent scorers (scope, trust, freshness, locality) plus a flat
//! policy bonus, combined through a normalized weight vector into a single
//! score on a 0-100 scale. Every sub-score is kept for explainability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{CorpusEntry, PatternType, Signals};

pub mod freshness;
pub mod locality;
pub mod parallel;
pub mod scope;
pub mod trust;
pub mod weights;

pub use freshness::score_freshness;
pub use locality::score_locality;
pub use parallel::{CandidateScorer, ParallelScorer, SequentialScorer, ShardedScorer};
pub use scope::{ScopeEvaluation, evaluate_scope, score_scope};
pub use trust::{score_trust, wilson_lower_bound};
pub use weights::ScoringWeights;

/// Combined scores are reported on this scale.
pub const SCORE_SCALE: f64 = 100.0;

/// Points granted to a policy whose bonus applies.
pub const POLICY_BONUS: f64 = 1.0;

/// One scorer's output: normalized `points` in [0, 1] plus the raw input it
/// was computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub points: f64,
    pub raw: f64,
}

impl ScoreComponent {
    #[must_use]
    pub const fn new(points: f64, raw: f64) -> Self {
        Self { points, raw }
    }
}

/// Per-dimension breakdown retained alongside the final score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub scope: ScoreComponent,
    pub trust: ScoreComponent,
    pub freshness: ScoreComponent,
    pub locality: ScoreComponent,
    pub policy: ScoreComponent,
}

/// Score for one corpus position.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub position: usize,
    pub id: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Everything a scorer needs besides the pattern itself. Cheap to share
/// across worker threads.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    /// Normalized signals.
    pub signals: Signals,
    pub now: DateTime<Utc>,
    pub weights: ScoringWeights,
    pub default_half_life_days: f64,
    pub policy_boost_requires_scope: bool,
}

impl ScoringContext {
    /// `weights` must already be normalized.
    #[must_use]
    pub fn new(signals: &Signals, weights: ScoringWeights) -> Self {
        Self {
            signals: signals.normalized(),
            now: Utc::now(),
            weights,
            default_half_life_days: 180.0,
            policy_boost_requires_scope: true,
        }
    }

    #[must_use]
    pub const fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    #[must_use]
    pub const fn with_default_half_life(mut self, days: f64) -> Self {
        self.default_half_life_days = days;
        self
    }

    #[must_use]
    pub const fn with_policy_boost_requires_scope(mut self, requires: bool) -> Self {
        self.policy_boost_requires_scope = requires;
        self
    }

    /// Score one pattern. Pure: the result depends only on the entry and
    /// this context.
    #[must_use]
    pub fn score(&self, position: usize, entry: &CorpusEntry) -> ScoredCandidate {
        let meta = &entry.meta;
        let scope_eval = scope::evaluate_entry(entry, &self.signals);
        let trust = score_trust(meta);
        let freshness = score_freshness(meta, self.now, self.default_half_life_days);
        let locality = score_locality(meta, &self.signals);

        let bonus_applies = meta.kind == PatternType::Policy
            && (scope_eval.matched || !self.policy_boost_requires_scope);
        let policy = if bonus_applies {
            ScoreComponent::new(POLICY_BONUS, 1.0)
        } else {
            ScoreComponent::new(0.0, 0.0)
        };

        let breakdown = ScoreBreakdown {
            scope: scope_eval.component(),
            trust,
            freshness,
            locality,
            policy,
        };
        ScoredCandidate {
            position,
            id: meta.id.clone(),
            score: self.combine(&breakdown),
            breakdown,
        }
    }

    /// Weighted sum of sub-score points, scaled to 0-100.
    #[must_use]
    pub fn combine(&self, breakdown: &ScoreBreakdown) -> f64 {
        let w = &self.weights;
        let sum = w.scope * breakdown.scope.points
            + w.trust * breakdown.trust.points
            + w.freshness * breakdown.freshness.points
            + w.locality * breakdown.locality.points
            + w.policy * breakdown.policy.points;
        sum * SCORE_SCALE
    }
}
