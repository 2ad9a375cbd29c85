use chrono::{Duration, TimeZone, Utc};

use patpack::core::{PatternType, Signals};
use patpack::scoring::{score_freshness, score_scope, wilson_lower_bound};
use patpack::test_utils::{PatternBuilder, TestCase, run_table_tests};

fn round3(value: f64) -> i64 {
    (value * 1000.0).round() as i64
}

#[test]
fn wilson_bound_table() -> Result<(), String> {
    let cases = vec![
        TestCase::new("no evidence", (0.0, 0.0), None),
        TestCase::new("two wins", (2.0, 0.0), Some(342)),
        TestCase::new("ten wins", (10.0, 0.0), Some(722)),
        TestCase::new("even split", (50.0, 50.0), Some(404)),
    ];
    run_table_tests(cases, |(alpha, beta)| wilson_lower_bound(alpha, beta).map(round3))
}

#[test]
fn more_evidence_raises_the_bound() {
    let ten = wilson_lower_bound(10.0, 0.0).unwrap();
    let two = wilson_lower_bound(2.0, 0.0).unwrap();
    assert!(ten > two);
}

#[test]
fn freshness_halves_each_half_life() -> Result<(), String> {
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap();
    let cases = vec![
        TestCase::new("today", 0i64, 1000i64),
        TestCase::new("one half-life", 30, 500),
        TestCase::new("two half-lives", 60, 250),
    ];
    run_table_tests(cases, |days| {
        let meta = PatternBuilder::new("p", PatternType::Pattern)
            .reviewed(now - Duration::days(days))
            .half_life(30.0)
            .meta();
        round3(score_freshness(&meta, now, 180.0).points)
    })
}

#[test]
fn empty_scope_is_neutral_and_mismatch_is_zero() {
    let signals = Signals::new().with_languages(["rust"]).with_paths(["src/lib.rs"]);
    let open = PatternBuilder::new("open", PatternType::Pattern).meta();
    let other = PatternBuilder::new("go", PatternType::Pattern).languages(&["go"]).meta();
    let exact = PatternBuilder::new("rs", PatternType::Pattern)
        .languages(&["rust"])
        .paths(&["src/**/*.rs"])
        .meta();

    let open = score_scope(&open, &signals).points;
    let other = score_scope(&other, &signals).points;
    let exact = score_scope(&exact, &signals).points;
    assert!((open - 0.5).abs() < 1e-9);
    assert!(other.abs() < 1e-9);
    assert!(exact > open);
}
