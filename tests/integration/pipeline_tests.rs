//! Signals through ranking into a finished pack.

use std::sync::Arc;

use tracing::Level;

use patpack::assert_logged;
use patpack::config::{Config, PackOverrides};
use patpack::core::{PatternType, Signals};
use patpack::pack::{PackBuilder, PackSerializer};
use patpack::storage::PatternRepository;
use patpack::test_utils::{LogCapture, PatternBuilder, ranked, sample_corpus};

use crate::common::{fixed_now, ranker, store};

#[test]
fn ranked_corpus_packs_within_budget() {
    let records = sample_corpus(300, fixed_now());
    let store = store(records);
    let config = Config::default();
    let ranker = ranker(&store, &config);

    let signals = Signals::new()
        .with_paths(["src/api/users/handler.rs", "src/db/pool.rs"])
        .with_languages(["rust"]);
    let ranked = ranker.rank_top(&signals, 40);
    assert!(!ranked.is_empty());
    assert!(ranked.len() <= 40);

    let build = PackBuilder::new(store, config.pack.clone())
        .with_now(fixed_now())
        .with_overrides(&PackOverrides::budget(4096))
        .assemble("add pagination", &ranked)
        .expect("pack builds");
    let pack = &build.pack;
    assert!(pack.meta.bytes <= 4096, "{} bytes", pack.meta.bytes);
    assert_eq!(PackSerializer::measure(pack).unwrap(), pack.meta.bytes);
    assert_eq!(pack.meta.total_ranked, ranked.len());
    assert_eq!(pack.meta.included, pack.entry_count());
    assert!(pack.policies.iter().all(|p| p.summary.chars().count() <= 120));
    assert!(pack.candidates.iter().all(|c| c.summary.chars().count() <= 120));

    // Nothing is listed twice.
    let mut ids: Vec<&str> = pack.ids().collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
}

#[test]
fn missing_bodies_are_logged_and_skipped() {
    let store = store(vec![PatternBuilder::new("real", PatternType::Pattern).build()]);
    let builder = PackBuilder::new(store, Config::default().pack);
    let capture = LogCapture::new();

    let pack = capture
        .run("patpack=debug", || builder.build("t", &[ranked("ghost", 99.0), ranked("real", 90.0)]))
        .expect("pack builds");

    assert_eq!(pack.meta.considered, 1);
    assert!(pack.contains("real"));
    assert_logged!(capture, Level::WARN, "no loadable body");
    let skipped = capture.matching(Level::WARN, "no loadable body");
    assert_eq!(skipped[0].field("id"), Some("ghost"));
    assert_logged!(capture, Level::INFO, "pack assembled");
}

#[test]
fn cross_references_suppress_listed_items() {
    let store = store(vec![
        PatternBuilder::new("p-orm", PatternType::Pattern)
            .notes("Avoid [ANTI:n-plus-one]; covered by [TEST:query-count]")
            .build(),
        PatternBuilder::new("n-plus-one", PatternType::AntiPattern).build(),
        PatternBuilder::new("lazy-load", PatternType::AntiPattern).build(),
        PatternBuilder::new("query-count", PatternType::Test).build(),
    ]);
    let pack = PackBuilder::new(store, Config::default().pack)
        .build(
            "t",
            &[
                ranked("p-orm", 90.0),
                ranked("n-plus-one", 80.0),
                ranked("lazy-load", 70.0),
                ranked("query-count", 60.0),
            ],
        )
        .unwrap();

    assert_eq!(pack.anti_patterns.len(), 1);
    assert_eq!(pack.anti_patterns[0].id, "lazy-load");
    assert!(pack.tests.is_empty());
    assert_eq!(pack.candidates[0].refs.tests, vec!["query-count"]);
}

#[test]
fn explain_rows_come_from_ranking() {
    let records = sample_corpus(50, fixed_now());
    let store = store(records);
    let config = Config::default();
    let ranked = ranker(&store, &config).rank(&Signals::new().with_languages(["go"]));

    let pack = PackBuilder::new(Arc::clone(&store) as Arc<dyn PatternRepository>, config.pack)
        .with_overrides(&PackOverrides {
            debug_explain: Some(true),
            ..PackOverrides::default()
        })
        .build("t", &ranked)
        .unwrap();

    let rows = pack.meta.explain.as_ref().expect("explain rows");
    assert_eq!(rows.len(), pack.meta.included);
    for row in rows {
        let source = ranked.iter().find(|r| r.id == row.id).expect("row for a ranked id");
        assert!((row.score - source.score).abs() < 0.01);
    }
}
