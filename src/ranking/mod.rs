//! Pattern ranking
//!
//! `PatternRanker` ties the pipeline together: normalize signals, consult the
//! query cache, generate candidates, score them, keep the best K in a bounded
//! heap and apply the near-tie chain. Construction validates the weight
//! vector, after which ranking cannot fail.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{CacheConfig, Config, RankOverrides, RankingConfig, ScoringConfig};
use crate::core::{Corpus, PatternMeta, PatternType, Signals};
use crate::error::Result;
use crate::scoring::{CandidateScorer, ParallelScorer, ScoreBreakdown, ScoringContext, ScoringWeights};
use crate::search::{CandidateGenerator, CandidateQuery, QueryCache};
use crate::storage::PatternRepository;

pub mod heap;

pub use heap::{TIE_EPSILON, TopK, display_order};

/// One ranked pattern with the breakdown its score was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPattern {
    pub id: String,
    pub score: f64,
    pub explain: ScoreBreakdown,
}

/// Counters accumulated across ranking calls.
#[derive(Debug, Default)]
pub struct RankerStats {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    candidates_generated: AtomicU64,
    candidates_scored: AtomicU64,
    heap_evictions: AtomicU64,
}

/// Point-in-time copy of [`RankerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RankerStatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub candidates_generated: u64,
    pub candidates_scored: u64,
    pub heap_evictions: u64,
}

impl RankerStats {
    fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> RankerStatsSnapshot {
        RankerStatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            candidates_generated: self.candidates_generated.load(Ordering::Relaxed),
            candidates_scored: self.candidates_scored.load(Ordering::Relaxed),
            heap_evictions: self.heap_evictions.load(Ordering::Relaxed),
        }
    }
}

/// Effective settings for one ranking call.
#[derive(Debug, Clone)]
struct RankPlan {
    k: usize,
    query: CandidateQuery,
    weights: ScoringWeights,
    policy_boost_requires_scope: bool,
    default_half_life_days: f64,
    /// Not part of the salt: it bounds entry age, not entry content.
    cache_ttl: Option<Duration>,
}

impl RankPlan {
    fn salt(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.k.hash(&mut hasher);
        self.query.candidate_cap.hash(&mut hasher);
        self.query.accepted_types.hash(&mut hasher);
        self.query.strict_owner.hash(&mut hasher);
        self.weights.fingerprint().hash(&mut hasher);
        self.policy_boost_requires_scope.hash(&mut hasher);
        self.default_half_life_days.to_bits().hash(&mut hasher);
        hasher.finish()
    }
}

pub struct PatternRanker {
    generator: CandidateGenerator,
    scorer: Box<dyn CandidateScorer>,
    ranking: RankingConfig,
    scoring: ScoringConfig,
    cache: Option<Arc<QueryCache>>,
    stats: RankerStats,
    now: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for PatternRanker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRanker")
            .field("patterns", &self.generator.corpus().len())
            .field("ranking", &self.ranking)
            .field("cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl PatternRanker {
    /// Index `metas` and validate the configured weights.
    pub fn new(metas: Vec<PatternMeta>, config: &Config) -> Result<Self> {
        let mut scoring = config.scoring.clone();
        scoring.weights = scoring.weights.normalized()?;

        let corpus = Arc::new(Corpus::new(metas));
        let generator = CandidateGenerator::build(corpus);
        debug!(patterns = generator.corpus().len(), "pattern ranker ready");

        Ok(Self {
            generator,
            scorer: Box::new(ParallelScorer::new(config.ranking.shard_threshold)),
            ranking: config.ranking.clone(),
            scoring,
            cache: build_cache(&config.cache),
            stats: RankerStats::default(),
            now: None,
        })
    }

    /// Snapshot every `PatternMeta` from `repo`.
    pub fn from_repository(repo: &dyn PatternRepository, config: &Config) -> Result<Self> {
        Self::new(repo.all_meta()?, config)
    }

    #[must_use]
    pub fn with_scorer(mut self, scorer: Box<dyn CandidateScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Replace the query cache, or disable caching with `None`.
    #[must_use]
    pub fn with_cache(mut self, cache: Option<Arc<QueryCache>>) -> Self {
        self.cache = cache;
        self
    }

    /// Pin the clock used for freshness scoring.
    #[must_use]
    pub const fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    #[must_use]
    pub fn corpus(&self) -> &Corpus {
        self.generator.corpus()
    }

    #[must_use]
    pub fn cache(&self) -> Option<&Arc<QueryCache>> {
        self.cache.as_ref()
    }

    #[must_use]
    pub const fn stats(&self) -> &RankerStats {
        &self.stats
    }

    /// Drop every cached ranking.
    pub fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
            debug!("query cache invalidated");
        }
    }

    /// Rank with the configured top-K.
    #[must_use]
    pub fn rank(&self, signals: &Signals) -> Vec<RankedPattern> {
        self.rank_plan(signals, &self.base_plan())
    }

    /// Rank and return at most `k` results.
    #[must_use]
    pub fn rank_top(&self, signals: &Signals, k: usize) -> Vec<RankedPattern> {
        let mut plan = self.base_plan();
        plan.k = k;
        self.rank_plan(signals, &plan)
    }

    /// Rank with per-call overrides. Fails only if overridden weights are
    /// invalid.
    pub fn rank_with(&self, signals: &Signals, overrides: &RankOverrides) -> Result<Vec<RankedPattern>> {
        let mut plan = self.base_plan();
        if let Some(k) = overrides.k {
            plan.k = k;
        }
        if let Some(cap) = overrides.candidate_cap {
            plan.query.candidate_cap = cap;
        }
        if let Some(types) = &overrides.accepted_types {
            plan.query.accepted_types.clone_from(types);
        }
        if let Some(strict) = overrides.strict_owner {
            plan.query.strict_owner = strict;
        }
        if let Some(weights) = overrides.weights {
            plan.weights = weights.normalized()?;
        }
        if let Some(requires) = overrides.policy_boost_requires_scope {
            plan.policy_boost_requires_scope = requires;
        }
        plan.cache_ttl = overrides.cache_ttl;
        Ok(self.rank_plan(signals, &plan))
    }

    fn base_plan(&self) -> RankPlan {
        RankPlan {
            k: self.ranking.k,
            query: CandidateQuery {
                accepted_types: if self.ranking.accepted_types.is_empty() {
                    PatternType::ALL.to_vec()
                } else {
                    self.ranking.accepted_types.clone()
                },
                candidate_cap: self.ranking.candidate_cap,
                strict_owner: self.ranking.strict_owner,
            },
            weights: self.scoring.weights,
            policy_boost_requires_scope: self.scoring.policy_boost_requires_scope,
            default_half_life_days: self.scoring.default_half_life_days,
            cache_ttl: None,
        }
    }

    fn rank_plan(&self, signals: &Signals, plan: &RankPlan) -> Vec<RankedPattern> {
        let signals = signals.normalized();
        let key = signals.cache_key(plan.salt());

        if let Some(cache) = &self.cache {
            let hit = match plan.cache_ttl {
                Some(ttl) => cache.get_within(key, ttl),
                None => cache.get(key),
            };
            if let Some(hit) = hit {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, results = hit.len(), "ranking cache hit");
                return hit;
            }
            self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        }

        let candidates = self.generator.generate(&signals, &plan.query);
        RankerStats::add(&self.stats.candidates_generated, candidates.positions.len());

        let ctx = ScoringContext::new(&signals, plan.weights)
            .with_now(self.now.unwrap_or_else(Utc::now))
            .with_default_half_life(plan.default_half_life_days)
            .with_policy_boost_requires_scope(plan.policy_boost_requires_scope);
        let scored = self
            .scorer
            .score(&ctx, self.generator.corpus(), &candidates.positions);
        RankerStats::add(&self.stats.candidates_scored, scored.len());

        let mut top = TopK::new(plan.k);
        for candidate in scored {
            top.push(candidate);
        }
        self.stats
            .heap_evictions
            .fetch_add(top.evictions(), Ordering::Relaxed);
        trace!(kept = top.len(), evicted = top.evictions(), "top-k selected");

        let results: Vec<RankedPattern> = top
            .into_sorted()
            .into_iter()
            .map(|c| RankedPattern {
                id: c.id,
                score: c.score,
                explain: c.breakdown,
            })
            .collect();

        debug!(
            candidates = candidates.positions.len(),
            returned = results.len(),
            k = plan.k,
            "ranked patterns"
        );

        if let Some(cache) = &self.cache {
            cache.put(key, results.clone());
        }
        results
    }
}

fn build_cache(config: &CacheConfig) -> Option<Arc<QueryCache>> {
    config
        .enabled
        .then(|| Arc::new(QueryCache::with_capacity(config.ttl(), config.max_entries)))
}
