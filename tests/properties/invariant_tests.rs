use proptest::prelude::*;

use patpack::config::{Config, PackConfig};
use patpack::core::{PatternRecord, PatternType, Signals};
use patpack::pack::PackBuilder;
use patpack::ranking::{PatternRanker, TIE_EPSILON};
use patpack::scoring::{SequentialScorer, ShardedScorer, wilson_lower_bound};
use patpack::storage::PatternRepository;
use patpack::test_utils::PatternBuilder;

use crate::common::{fixed_now, store};

const LANGS: [&str; 4] = ["rust", "go", "python", "typescript"];
const ROOTS: [&str; 4] = ["src/api", "src/db", "web", "tests"];

fn arb_record(index: usize) -> impl Strategy<Value = PatternRecord> {
    (
        0..PatternType::ALL.len(),
        proptest::option::of(0..LANGS.len()),
        proptest::option::of(0..ROOTS.len()),
        0.0f64..20.0,
        0.0f64..10.0,
        0usize..400,
        10usize..160,
        0usize..30,
    )
        .prop_map(move |(kind, lang, root, alpha, beta, age, summary_len, lines)| {
            let now = fixed_now();
            let mut builder = PatternBuilder::new(&format!("p-{index:03}"), PatternType::ALL[kind])
                .summary(&"x".repeat(summary_len))
                .trust(alpha, beta)
                .reviewed_days_ago(now, age as i64)
                .updated(now - chrono::Duration::days(age as i64));
            if let Some(lang) = lang {
                builder = builder.languages(&[LANGS[lang]]);
            }
            if let Some(root) = root {
                builder = builder.paths(&[&format!("{}/**", ROOTS[root])]);
            }
            if lines > 0 {
                builder = builder.snippet_lines(&format!("src/p{index}.rs"), lines);
            }
            builder.build()
        })
}

fn arb_corpus() -> impl Strategy<Value = Vec<PatternRecord>> {
    (1usize..40).prop_flat_map(|n| (0..n).map(arb_record).collect::<Vec<_>>())
}

fn arb_signals() -> impl Strategy<Value = Signals> {
    (
        proptest::sample::subsequence(LANGS.to_vec(), 0..=2),
        proptest::sample::subsequence(ROOTS.to_vec(), 0..=2),
    )
        .prop_map(|(langs, roots)| {
            Signals::new()
                .with_languages(langs)
                .with_paths(roots.iter().map(|r| format!("{r}/handler.rs")))
        })
}

fn rank_all(records: &[PatternRecord], signals: &Signals, k: usize) -> Vec<patpack::ranking::RankedPattern> {
    let metas = records.iter().map(|r| r.meta.clone()).collect();
    PatternRanker::new(metas, &Config::default())
        .expect("default weights are valid")
        .with_now(fixed_now())
        .with_cache(None)
        .rank_top(signals, k)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn pack_respects_budget_unless_policies_overflow(
        records in arb_corpus(),
        signals in arb_signals(),
        budget in 200usize..6000,
    ) {
        let ranked = rank_all(&records, &signals, records.len());
        let config = PackConfig { budget_bytes: budget, ..PackConfig::default() };
        let build = PackBuilder::new(store(records), config)
            .with_now(fixed_now())
            .assemble("task", &ranked)
            .unwrap();
        let pack = &build.pack;
        prop_assert_eq!(build.canonical.len(), pack.meta.bytes);
        if pack.meta.bytes > budget {
            prop_assert!(pack.candidates.is_empty() && pack.anti_patterns.is_empty() && pack.tests.is_empty());
            prop_assert!(!pack.policies.is_empty());
        }
        for step in &build.ablation.steps {
            prop_assert!(step.bytes_after <= step.bytes_before);
        }
    }

    #[test]
    fn ranking_is_deterministic(records in arb_corpus(), signals in arb_signals()) {
        let first = rank_all(&records, &signals, 10);
        let second = rank_all(&records, &signals, 10);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn unscoped_patterns_always_survive_filters(records in arb_corpus(), signals in arb_signals()) {
        let ranked = rank_all(&records, &signals, records.len());
        for record in &records {
            let scope = &record.meta.scope;
            if scope.paths.is_empty() && scope.languages.is_empty() && scope.frameworks.is_empty() {
                prop_assert!(ranked.iter().any(|r| r.id == record.meta.id), "{} filtered", record.meta.id);
            }
        }
    }

    #[test]
    fn top_k_is_bounded_and_dominant(records in arb_corpus(), signals in arb_signals(), k in 1usize..12) {
        let all = rank_all(&records, &signals, records.len());
        let top = rank_all(&records, &signals, k);
        prop_assert!(top.len() <= k);
        prop_assert_eq!(top.len(), k.min(all.len()));
        if let Some(weakest) = top.iter().map(|r| r.score).reduce(f64::min) {
            for other in all.iter().filter(|r| !top.iter().any(|t| t.id == r.id)) {
                prop_assert!(weakest + TIE_EPSILON >= other.score);
            }
        }
    }

    #[test]
    fn sharding_does_not_change_scores(records in arb_corpus(), signals in arb_signals(), shard in 1usize..8) {
        let store = store(records);
        let metas = store.all_meta().unwrap();
        let sequential = PatternRanker::new(metas.clone(), &Config::default())
            .unwrap()
            .with_now(fixed_now())
            .with_scorer(Box::new(SequentialScorer))
            .rank_top(&signals, 50);
        let sharded = PatternRanker::new(metas, &Config::default())
            .unwrap()
            .with_now(fixed_now())
            .with_scorer(Box::new(ShardedScorer::new(shard)))
            .rank_top(&signals, 50);
        prop_assert_eq!(sequential, sharded);
    }

    #[test]
    fn wilson_rewards_evidence_at_equal_rate(successes in 1u32..200, extra in 1u32..200) {
        let low = wilson_lower_bound(f64::from(successes), 0.0).unwrap();
        let high = wilson_lower_bound(f64::from(successes + extra), 0.0).unwrap();
        prop_assert!(high > low);
    }
}
