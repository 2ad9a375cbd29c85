//! Layered configuration: defaults, then an optional TOML file, then
//! `PATPACK_*` environment overrides. Per-call tweaks go through
//! [`RankOverrides`] and [`PackOverrides`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::PatternType;
use crate::error::{PatpackError, Result};
use crate::scoring::ScoringWeights;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub pack: PackConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load from `explicit_path`, else `PATPACK_CONFIG`, else the user
    /// config directory (`patpack/config.toml`). Missing files are not an
    /// error; environment overrides are applied last.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let path = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("PATPACK_CONFIG").ok().map(PathBuf::from))
            .or_else(|| dirs::config_dir().map(|dir| dir.join("patpack/config.toml")));

        if let Some(path) = path {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Defaults patched with a TOML document. No environment lookups.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let patch: ConfigPatch =
            toml::from_str(raw).map_err(|err| PatpackError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        Ok(config)
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| PatpackError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| PatpackError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.ranking {
            self.ranking.merge(patch);
        }
        if let Some(patch) = patch.scoring {
            self.scoring.merge(patch);
        }
        if let Some(patch) = patch.pack {
            self.pack.merge(patch);
        }
        if let Some(patch) = patch.cache {
            self.cache.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `PATPACK_*` overrides read through `lookup`.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let env = Env { lookup: &lookup };

        if let Some(value) = env.usize("PATPACK_TOP_K")? {
            self.ranking.k = value;
        }
        if let Some(value) = env.usize("PATPACK_CANDIDATE_CAP")? {
            self.ranking.candidate_cap = value;
        }
        if let Some(value) = env.usize("PATPACK_SHARD_THRESHOLD")? {
            self.ranking.shard_threshold = value;
        }
        if let Some(values) = env.list("PATPACK_ACCEPTED_TYPES") {
            self.ranking.accepted_types = values
                .iter()
                .map(|v| v.parse())
                .collect::<Result<Vec<PatternType>>>()?;
        }
        if let Some(value) = env.bool("PATPACK_STRICT_OWNER") {
            self.ranking.strict_owner = value;
        }

        if let Some(value) = env.f64("PATPACK_WEIGHT_SCOPE")? {
            self.scoring.weights.scope = value;
        }
        if let Some(value) = env.f64("PATPACK_WEIGHT_TRUST")? {
            self.scoring.weights.trust = value;
        }
        if let Some(value) = env.f64("PATPACK_WEIGHT_FRESHNESS")? {
            self.scoring.weights.freshness = value;
        }
        if let Some(value) = env.f64("PATPACK_WEIGHT_LOCALITY")? {
            self.scoring.weights.locality = value;
        }
        if let Some(value) = env.f64("PATPACK_WEIGHT_POLICY")? {
            self.scoring.weights.policy = value;
        }
        if let Some(value) = env.bool("PATPACK_POLICY_BOOST_REQUIRES_SCOPE") {
            self.scoring.policy_boost_requires_scope = value;
        }
        if let Some(value) = env.f64("PATPACK_DEFAULT_HALF_LIFE_DAYS")? {
            self.scoring.default_half_life_days = value;
        }

        if let Some(value) = env.usize("PATPACK_BUDGET_BYTES")? {
            self.pack.budget_bytes = value;
        }
        if let Some(value) = env.usize("PATPACK_SNIPPET_LINES_INIT")? {
            self.pack.snippet_lines_init = value;
        }
        if let Some(value) = env.usize("PATPACK_SNIPPET_LINES_MIN")? {
            self.pack.snippet_lines_min = value;
        }
        if let Some(value) = env.bool("PATPACK_DEBUG_EXPLAIN") {
            self.pack.debug_explain = value;
        }

        if let Some(value) = env.bool("PATPACK_CACHE_ENABLED") {
            self.cache.enabled = value;
        }
        if let Some(value) = env.u64("PATPACK_CACHE_TTL_SECONDS")? {
            self.cache.ttl_seconds = value;
        }
        if let Some(value) = env.usize("PATPACK_CACHE_MAX_ENTRIES")? {
            self.cache.max_entries = value;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Results returned per ranking call.
    pub k: usize,
    pub candidate_cap: usize,
    /// Candidate count at which scoring switches to sharded workers.
    pub shard_threshold: usize,
    pub accepted_types: Vec<PatternType>,
    /// Filter out patterns owned by another repository or organization.
    pub strict_owner: bool,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            k: 10,
            candidate_cap: 1500,
            shard_threshold: 256,
            accepted_types: PatternType::ALL.to_vec(),
            strict_owner: false,
        }
    }
}

impl RankingConfig {
    fn merge(&mut self, patch: RankingPatch) {
        if let Some(value) = patch.k {
            self.k = value;
        }
        if let Some(value) = patch.candidate_cap {
            self.candidate_cap = value;
        }
        if let Some(value) = patch.shard_threshold {
            self.shard_threshold = value;
        }
        if let Some(value) = patch.accepted_types {
            self.accepted_types = value;
        }
        if let Some(value) = patch.strict_owner {
            self.strict_owner = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub policy_boost_requires_scope: bool,
    /// Used when a pattern declares no half-life of its own.
    pub default_half_life_days: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            policy_boost_requires_scope: true,
            default_half_life_days: 180.0,
        }
    }
}

impl ScoringConfig {
    fn merge(&mut self, patch: ScoringPatch) {
        if let Some(weights) = patch.weights {
            if let Some(value) = weights.scope {
                self.weights.scope = value;
            }
            if let Some(value) = weights.trust {
                self.weights.trust = value;
            }
            if let Some(value) = weights.freshness {
                self.weights.freshness = value;
            }
            if let Some(value) = weights.locality {
                self.weights.locality = value;
            }
            if let Some(value) = weights.policy {
                self.weights.policy = value;
            }
        }
        if let Some(value) = patch.policy_boost_requires_scope {
            self.policy_boost_requires_scope = value;
        }
        if let Some(value) = patch.default_half_life_days {
            self.default_half_life_days = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    pub budget_bytes: usize,
    pub snippet_lines_init: usize,
    pub snippet_lines_min: usize,
    pub top_candidates_quota: usize,
    pub failures_quota: usize,
    pub antis_quota: usize,
    pub tests_quota: usize,
    /// Minimum score for the top-candidate phase.
    pub top_score_threshold: f64,
    /// Failures older than this are left to the fill phase.
    pub failure_window_days: i64,
    /// Lines kept around a detected enclosing block.
    pub context_margin_lines: usize,
    /// Attach per-pattern score breakdowns to `meta.explain`.
    pub debug_explain: bool,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            budget_bytes: 8192,
            snippet_lines_init: 18,
            snippet_lines_min: 8,
            top_candidates_quota: 3,
            failures_quota: 2,
            antis_quota: 1,
            tests_quota: 1,
            top_score_threshold: 80.0,
            failure_window_days: 90,
            context_margin_lines: 6,
            debug_explain: false,
        }
    }
}

impl PackConfig {
    fn merge(&mut self, patch: PackPatch) {
        if let Some(value) = patch.budget_bytes {
            self.budget_bytes = value;
        }
        if let Some(value) = patch.snippet_lines_init {
            self.snippet_lines_init = value;
        }
        if let Some(value) = patch.snippet_lines_min {
            self.snippet_lines_min = value;
        }
        if let Some(value) = patch.top_candidates_quota {
            self.top_candidates_quota = value;
        }
        if let Some(value) = patch.failures_quota {
            self.failures_quota = value;
        }
        if let Some(value) = patch.antis_quota {
            self.antis_quota = value;
        }
        if let Some(value) = patch.tests_quota {
            self.tests_quota = value;
        }
        if let Some(value) = patch.top_score_threshold {
            self.top_score_threshold = value;
        }
        if let Some(value) = patch.failure_window_days {
            self.failure_window_days = value;
        }
        if let Some(value) = patch.context_margin_lines {
            self.context_margin_lines = value;
        }
        if let Some(value) = patch.debug_explain {
            self.debug_explain = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    /// Zero means unbounded.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 1800,
            max_entries: 0,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    fn merge(&mut self, patch: CachePatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.ttl_seconds {
            self.ttl_seconds = value;
        }
        if let Some(value) = patch.max_entries {
            self.max_entries = value;
        }
    }
}

/// Per-call ranking overrides. `None` keeps the configured value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankOverrides {
    pub k: Option<usize>,
    pub candidate_cap: Option<usize>,
    pub accepted_types: Option<Vec<PatternType>>,
    pub weights: Option<ScoringWeights>,
    pub policy_boost_requires_scope: Option<bool>,
    pub strict_owner: Option<bool>,
    /// Freshness window for cached results on this call. `Duration::ZERO`
    /// forces a recompute.
    pub cache_ttl: Option<Duration>,
}

impl RankOverrides {
    #[must_use]
    pub fn k(k: usize) -> Self {
        Self {
            k: Some(k),
            ..Self::default()
        }
    }
}

/// Per-call pack overrides. `None` keeps the configured value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackOverrides {
    pub budget_bytes: Option<usize>,
    pub snippet_lines_init: Option<usize>,
    pub snippet_lines_min: Option<usize>,
    pub top_candidates_quota: Option<usize>,
    pub failures_quota: Option<usize>,
    pub antis_quota: Option<usize>,
    pub tests_quota: Option<usize>,
    pub debug_explain: Option<bool>,
}

impl PackOverrides {
    #[must_use]
    pub fn budget(budget_bytes: usize) -> Self {
        Self {
            budget_bytes: Some(budget_bytes),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn apply(&self, base: &PackConfig) -> PackConfig {
        let mut out = base.clone();
        out.budget_bytes = self.budget_bytes.unwrap_or(out.budget_bytes);
        out.snippet_lines_init = self.snippet_lines_init.unwrap_or(out.snippet_lines_init);
        out.snippet_lines_min = self.snippet_lines_min.unwrap_or(out.snippet_lines_min);
        out.top_candidates_quota = self.top_candidates_quota.unwrap_or(out.top_candidates_quota);
        out.failures_quota = self.failures_quota.unwrap_or(out.failures_quota);
        out.antis_quota = self.antis_quota.unwrap_or(out.antis_quota);
        out.tests_quota = self.tests_quota.unwrap_or(out.tests_quota);
        out.debug_explain = self.debug_explain.unwrap_or(out.debug_explain);
        out
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub ranking: Option<RankingPatch>,
    pub scoring: Option<ScoringPatch>,
    pub pack: Option<PackPatch>,
    pub cache: Option<CachePatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RankingPatch {
    pub k: Option<usize>,
    pub candidate_cap: Option<usize>,
    pub shard_threshold: Option<usize>,
    pub accepted_types: Option<Vec<PatternType>>,
    pub strict_owner: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WeightsPatch {
    pub scope: Option<f64>,
    pub trust: Option<f64>,
    pub freshness: Option<f64>,
    pub locality: Option<f64>,
    pub policy: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ScoringPatch {
    pub weights: Option<WeightsPatch>,
    pub policy_boost_requires_scope: Option<bool>,
    pub default_half_life_days: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PackPatch {
    pub budget_bytes: Option<usize>,
    pub snippet_lines_init: Option<usize>,
    pub snippet_lines_min: Option<usize>,
    pub top_candidates_quota: Option<usize>,
    pub failures_quota: Option<usize>,
    pub antis_quota: Option<usize>,
    pub tests_quota: Option<usize>,
    pub top_score_threshold: Option<f64>,
    pub failure_window_days: Option<i64>,
    pub context_margin_lines: Option<usize>,
    pub debug_explain: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CachePatch {
    pub enabled: Option<bool>,
    pub ttl_seconds: Option<u64>,
    pub max_entries: Option<usize>,
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn bool(&self, key: &str) -> Option<bool> {
        (self.lookup)(key).map(|value| {
            matches!(
                value.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    fn parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.lookup)(key) {
            Some(value) => value.trim().parse::<T>().map(Some).map_err(|err| {
                PatpackError::Config(format!("invalid {key} value {value}: {err}"))
            }),
            None => Ok(None),
        }
    }

    fn usize(&self, key: &str) -> Result<Option<usize>> {
        self.parsed(key)
    }

    fn u64(&self, key: &str) -> Result<Option<u64>> {
        self.parsed(key)
    }

    fn f64(&self, key: &str) -> Result<Option<f64>> {
        self.parsed(key)
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        (self.lookup)(key).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.ranking.k, 10);
        assert_eq!(config.ranking.candidate_cap, 1500);
        assert_eq!(config.pack.budget_bytes, 8192);
        assert_eq!(config.pack.snippet_lines_init, 18);
        assert_eq!(config.pack.snippet_lines_min, 8);
        assert_eq!(
            (
                config.pack.top_candidates_quota,
                config.pack.failures_quota,
                config.pack.antis_quota,
                config.pack.tests_quota
            ),
            (3, 2, 1, 1)
        );
        assert_eq!(config.cache.ttl(), Duration::from_secs(1800));
        assert!(config.scoring.policy_boost_requires_scope);
    }

    #[test]
    fn toml_patch_only_touches_named_fields() {
        let config = Config::from_toml_str(
            r#"
[ranking]
k = 5
accepted_types = ["policy", "pattern"]

[scoring.weights]
trust = 0.5

[pack]
budget_bytes = 4096
"#,
        )
        .unwrap();
        assert_eq!(config.ranking.k, 5);
        assert_eq!(config.ranking.candidate_cap, 1500);
        assert_eq!(
            config.ranking.accepted_types,
            vec![PatternType::Policy, PatternType::Pattern]
        );
        assert!((config.scoring.weights.trust - 0.5).abs() < f64::EPSILON);
        assert!((config.scoring.weights.scope - 0.35).abs() < f64::EPSILON);
        assert_eq!(config.pack.budget_bytes, 4096);
        assert_eq!(config.pack.snippet_lines_init, 18);
    }

    #[test]
    fn sections_deserialized_alone_keep_defaults() {
        let pack: PackConfig = serde_json::from_str(r#"{"budget_bytes": 2048}"#).unwrap();
        assert_eq!(pack.budget_bytes, 2048);
        assert_eq!(pack.snippet_lines_init, 18);
        assert_eq!(pack.top_candidates_quota, 3);

        let cache: CacheConfig = toml::from_str("ttl_seconds = 5").unwrap();
        assert!(cache.enabled);
        assert_eq!(cache.ttl(), Duration::from_secs(5));

        let ranking: RankingConfig = toml::from_str("strict_owner = true").unwrap();
        assert_eq!(ranking.k, 10);
        assert_eq!(ranking.accepted_types, PatternType::ALL.to_vec());

        let scoring: ScoringConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(scoring, ScoringConfig::default());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Config::from_toml_str("[ranking\nk = ").unwrap_err();
        assert!(matches!(err, PatpackError::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        config
            .apply_overrides_from(env(&[
                ("PATPACK_BUDGET_BYTES", "1024"),
                ("PATPACK_TOP_K", "3"),
                ("PATPACK_CACHE_ENABLED", "off"),
                ("PATPACK_WEIGHT_POLICY", "0.3"),
                ("PATPACK_ACCEPTED_TYPES", "policy, anti-pattern"),
            ]))
            .unwrap();
        assert_eq!(config.pack.budget_bytes, 1024);
        assert_eq!(config.ranking.k, 3);
        assert!(!config.cache.enabled);
        assert!((config.scoring.weights.policy - 0.3).abs() < f64::EPSILON);
        assert_eq!(
            config.ranking.accepted_types,
            vec![PatternType::Policy, PatternType::AntiPattern]
        );
    }

    #[test]
    fn invalid_env_values_are_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides_from(env(&[("PATPACK_BUDGET_BYTES", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("PATPACK_BUDGET_BYTES"));

        let err = config
            .apply_overrides_from(env(&[("PATPACK_ACCEPTED_TYPES", "widget")]))
            .unwrap_err();
        assert!(matches!(err, PatpackError::Config(_)));
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patpack.toml");
        std::fs::write(&path, "[cache]\nttl_seconds = 60\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.cache.ttl_seconds, 60);
    }

    #[test]
    fn pack_overrides_layer_over_config() {
        let base = PackConfig::default();
        let merged = PackOverrides {
            budget_bytes: Some(300),
            tests_quota: Some(0),
            ..PackOverrides::default()
        }
        .apply(&base);
        assert_eq!(merged.budget_bytes, 300);
        assert_eq!(merged.tests_quota, 0);
        assert_eq!(merged.snippet_lines_init, base.snippet_lines_init);
    }
}
