//! Ranker behavior over realistic corpora.

use std::sync::Arc;
use std::time::Duration;

use patpack::config::{Config, RankOverrides};
use patpack::core::{PatternType, Signals};
use patpack::error::PatpackError;
use patpack::ranking::{PatternRanker, TIE_EPSILON};
use patpack::scoring::ScoringWeights;
use patpack::search::QueryCache;
use patpack::test_utils::{PatternBuilder, sample_corpus};

use crate::common::{fixed_now, ranker, store};

#[test]
fn reordered_signals_hit_the_cache() {
    let store = store(sample_corpus(120, fixed_now()));
    let ranker = ranker(&store, &Config::default());

    let first = ranker.rank(&Signals::new().with_languages(["js", "ts"]).with_paths(["src/a.rs", "web/b.tsx"]));
    let second = ranker.rank(&Signals::new().with_languages(["ts", "js"]).with_paths(["web/b.tsx", "src/a.rs"]));
    assert_eq!(first, second);

    let stats = ranker.stats().snapshot();
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.cache_hits, 1);
    let scored = stats.candidates_scored;

    let _ = ranker.rank(&Signals::new().with_languages(["js", "ts"]).with_paths(["src/a.rs", "web/b.tsx"]));
    assert_eq!(ranker.stats().snapshot().candidates_scored, scored, "cache hit must not re-score");
}

#[test]
fn expired_entries_are_recomputed() {
    let store = store(sample_corpus(40, fixed_now()));
    let cache = Arc::new(QueryCache::new(Duration::ZERO));
    let ranker = ranker(&store, &Config::default()).with_cache(Some(cache));
    let signals = Signals::new().with_languages(["rust"]);

    let _ = ranker.rank(&signals);
    let _ = ranker.rank(&signals);
    assert_eq!(ranker.stats().snapshot().cache_misses, 2);
}

#[test]
fn zero_weights_fail_at_construction() {
    let mut config = Config::default();
    config.scoring.weights = ScoringWeights {
        scope: 0.0,
        trust: 0.0,
        freshness: 0.0,
        locality: 0.0,
        policy: 0.0,
    };
    let err = PatternRanker::new(Vec::new(), &config).unwrap_err();
    assert!(matches!(err, PatpackError::Config(_)));
}

#[test]
fn results_are_ordered_and_bounded() {
    let store = store(sample_corpus(500, fixed_now()));
    let ranker = ranker(&store, &Config::default());
    let signals = Signals::new()
        .with_paths(["src/api/orders/create.rs"])
        .with_languages(["rust"])
        .with_framework("axum", Some("0.7.5"));

    for k in [1, 5, 25] {
        let ranked = ranker.rank_top(&signals, k);
        assert!(ranked.len() <= k);
        for pair in ranked.windows(2) {
            assert!(pair[0].score + TIE_EPSILON >= pair[1].score, "{pair:?}");
        }
    }
}

#[test]
fn equal_scores_break_ties_by_id() {
    let metas = ["delta", "alpha", "charlie", "bravo"]
        .into_iter()
        .map(|id| PatternBuilder::new(id, PatternType::Pattern).trust(4.0, 1.0).meta())
        .collect();
    let ranker = PatternRanker::new(metas, &Config::default())
        .unwrap()
        .with_now(fixed_now());
    let ids: Vec<String> = ranker.rank(&Signals::new()).into_iter().map(|r| r.id).collect();
    assert_eq!(ids, ["alpha", "bravo", "charlie", "delta"]);
}

#[test]
fn stronger_evidence_ranks_higher() {
    let metas = vec![
        PatternBuilder::new("few", PatternType::Pattern).trust(2.0, 0.0).meta(),
        PatternBuilder::new("many", PatternType::Pattern).trust(10.0, 0.0).meta(),
    ];
    let ranker = PatternRanker::new(metas, &Config::default()).unwrap().with_now(fixed_now());
    let ranked = ranker.rank(&Signals::new());
    assert_eq!(ranked[0].id, "many");
    assert!(ranked[0].explain.trust.points > ranked[1].explain.trust.points);
}

#[test]
fn overrides_restrict_types_per_call() {
    let store = store(sample_corpus(70, fixed_now()));
    let ranker = ranker(&store, &Config::default());
    let overrides = RankOverrides {
        accepted_types: Some(vec![PatternType::Policy]),
        k: Some(100),
        ..RankOverrides::default()
    };
    let ranked = ranker.rank_with(&Signals::new(), &overrides).unwrap();
    assert_eq!(ranked.len(), 10);
    for r in &ranked {
        let pos = ranker.corpus().position(&r.id).expect("ranked id is indexed");
        assert_eq!(ranker.corpus().get(pos).unwrap().meta.kind, PatternType::Policy);
    }
}
