//! A policy, a strong candidate with a long snippet and a weak candidate,
//! packed under progressively tighter budgets.

use patpack::config::PackConfig;
use patpack::core::PatternType;
use patpack::pack::{PackBuilder, PatternPack};
use patpack::ranking::RankedPattern;
use patpack::test_utils::{PatternBuilder, ranked};

use crate::common::{fixed_now, store};

const POLICY_SUMMARY: &str = "Never write credentials or API tokens to the repo.";

fn corpus() -> Vec<patpack::core::PatternRecord> {
    vec![
        PatternBuilder::new("pol-secrets", PatternType::Policy)
            .summary(POLICY_SUMMARY)
            .build(),
        PatternBuilder::new("p-retry", PatternType::Pattern)
            .title("Retry with jittered backoff")
            .summary("Wrap transient network calls in bounded retries")
            .snippet_lines("src/net/retry.rs", 20)
            .build(),
        PatternBuilder::new("p-log", PatternType::Pattern)
            .title("Structured logging")
            .summary("Log with fields, not format strings")
            .snippet_lines("src/log.rs", 5)
            .build(),
    ]
}

fn ranking() -> Vec<RankedPattern> {
    vec![ranked("p-retry", 95.0), ranked("p-log", 60.0), ranked("pol-secrets", 40.0)]
}

fn build(budget: usize) -> PatternPack {
    let config = PackConfig {
        budget_bytes: budget,
        ..PackConfig::default()
    };
    let build = PackBuilder::new(store(corpus()), config)
        .with_now(fixed_now())
        .assemble("harden http client", &ranking())
        .expect("pack builds");
    assert_eq!(build.canonical.len(), build.pack.meta.bytes);
    build.pack
}

#[test]
fn policy_and_top_candidate_with_trimmed_snippet() {
    assert_eq!(POLICY_SUMMARY.len(), 50);
    let pack = build(1100);

    assert_eq!(pack.meta.included, 2);
    assert_eq!(pack.policies.len(), 1);
    assert_eq!(pack.policies[0].summary, POLICY_SUMMARY);
    assert_eq!(pack.candidates.len(), 1);
    let top = &pack.candidates[0];
    assert_eq!(top.id, "p-retry");
    let snippet = top.snippet.as_ref().expect("top candidate keeps a snippet");
    assert_eq!(snippet.line_count(), 18);
    assert_eq!(snippet.source.as_deref(), Some("src/net/retry.rs:1-18"));
    assert!(!pack.contains("p-log"));
    assert!(pack.meta.bytes <= 1100);
}

#[test]
fn tighter_budget_falls_back_to_minimum_snippet() {
    let pack = build(800);
    assert_eq!(pack.meta.included, 2);
    let snippet = pack.candidates[0].snippet.as_ref().expect("snippet at min lines");
    assert_eq!(snippet.line_count(), 8);
    assert!(!pack.contains("p-log"));
    assert!(pack.meta.bytes <= 800);
}

#[test]
fn policy_is_kept_when_nothing_else_fits() {
    let pack = build(300);
    assert_eq!(pack.meta.included, 1);
    assert!(pack.contains("pol-secrets"));
    assert!(pack.candidates.is_empty());
    assert!(pack.meta.bytes <= 300);
    assert_eq!(pack.meta.total_ranked, 3);
    assert_eq!(pack.meta.considered, 3);
}

#[test]
fn oversized_policy_is_reported_not_fatal() {
    let config = PackConfig {
        budget_bytes: 120,
        ..PackConfig::default()
    };
    let build = PackBuilder::new(store(corpus()), config)
        .assemble("harden http client", &ranking())
        .expect("overflow is not an error");
    assert!(!build.within_budget());
    assert!(!build.ablation.within_budget);
    assert_eq!(build.pack.policies.len(), 1);
    assert!(build.pack.candidates.is_empty());
    assert!(build.pack.meta.bytes > build.pack.meta.budget_bytes);
}
