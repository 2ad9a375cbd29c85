use std::collections::HashMap;

use patpack::config::Config;
use patpack::core::PatternType;
use patpack::test_utils::{TestCase, run_table_tests};

#[test]
fn toml_sections_patch_defaults() -> Result<(), String> {
    let cases = vec![
        TestCase::new("empty document", "", (10usize, 8192usize, 1800u64, true)),
        TestCase::new("ranking only", "[ranking]\nk = 25\n", (25, 8192, 1800, true)),
        TestCase::new(
            "pack and cache",
            "[pack]\nbudget_bytes = 2048\n\n[cache]\nenabled = false\nttl_seconds = 60\n",
            (10, 2048, 60, false),
        ),
    ];
    run_table_tests(cases, |raw| {
        let config = Config::from_toml_str(raw).expect("valid toml");
        (
            config.ranking.k,
            config.pack.budget_bytes,
            config.cache.ttl_seconds,
            config.cache.enabled,
        )
    })
}

#[test]
fn config_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[ranking]
accepted_types = ["pattern", "anti-pattern"]
strict_owner = true

[scoring.weights]
scope = 2.0
trust = 1.0

[pack]
snippet_lines_init = 12
debug_explain = true
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.ranking.accepted_types, vec![PatternType::Pattern, PatternType::AntiPattern]);
    assert!(config.ranking.strict_owner);
    assert!((config.scoring.weights.scope - 2.0).abs() < f64::EPSILON);
    assert!((config.scoring.weights.freshness - 0.15).abs() < f64::EPSILON);
    assert_eq!(config.pack.snippet_lines_init, 12);
    assert_eq!(config.pack.snippet_lines_min, 8);
    assert!(config.pack.debug_explain);
}

#[test]
fn malformed_toml_is_a_config_error() {
    let err = Config::from_toml_str("[pack]\nbudget_bytes = \"lots\"\n").unwrap_err();
    assert!(err.to_string().starts_with("configuration error"));
}

#[test]
fn environment_overrides_win() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("PATPACK_BUDGET_BYTES", "4096"),
        ("PATPACK_TOP_K", "3"),
        ("PATPACK_WEIGHT_TRUST", "0.5"),
        ("PATPACK_CACHE_ENABLED", "false"),
    ]);
    let mut config = Config::from_toml_str("[pack]\nbudget_bytes = 1024\n").unwrap();
    config
        .apply_overrides_from(|key| env.get(key).map(|v| (*v).to_string()))
        .unwrap();
    assert_eq!(config.pack.budget_bytes, 4096);
    assert_eq!(config.ranking.k, 3);
    assert!((config.scoring.weights.trust - 0.5).abs() < f64::EPSILON);
    assert!(!config.cache.enabled);

    let bad: HashMap<&str, &str> = HashMap::from([("PATPACK_TOP_K", "many")]);
    assert!(
        config
            .apply_overrides_from(|key| bad.get(key).map(|v| (*v).to_string()))
            .is_err()
    );
}
