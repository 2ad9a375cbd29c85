//! Pattern records as read from the pattern store.
//!
//! `PatternMeta` is the indexable projection used by candidate generation and
//! scoring. `PatternRecord` is the full body loaded on demand by the pack
//! builder. Both are validated once when they cross the storage boundary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::error::{PatpackError, Result};

use super::paths::normalize_path;
use super::signals::FrameworkSignal;

/// Closed set of pattern kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Ordinary reusable solution.
    Pattern,
    /// Language or codebase convention.
    Convention,
    #[serde(alias = "anti-pattern", alias = "antipattern")]
    AntiPattern,
    /// Record of a past failure and its cause.
    Failure,
    Policy,
    /// Test pattern.
    Test,
    /// Migration note.
    Migration,
}

impl PatternType {
    pub const ALL: [Self; 7] = [
        Self::Pattern,
        Self::Convention,
        Self::AntiPattern,
        Self::Failure,
        Self::Policy,
        Self::Test,
        Self::Migration,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Convention => "convention",
            Self::AntiPattern => "anti_pattern",
            Self::Failure => "failure",
            Self::Policy => "policy",
            Self::Test => "test",
            Self::Migration => "migration",
        }
    }

    /// Kinds that carry a solution and compete for the top-candidate slots.
    #[must_use]
    pub const fn is_solution(self) -> bool {
        matches!(self, Self::Pattern | Self::Convention | Self::Migration)
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = PatpackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pattern" => Ok(Self::Pattern),
            "convention" | "language_convention" => Ok(Self::Convention),
            "anti_pattern" | "antipattern" | "anti" => Ok(Self::AntiPattern),
            "failure" => Ok(Self::Failure),
            "policy" => Ok(Self::Policy),
            "test" | "test_pattern" => Ok(Self::Test),
            "migration" | "migration_note" => Ok(Self::Migration),
            other => Err(PatpackError::Config(format!(
                "unknown pattern type {other} (expected one of pattern|convention|anti_pattern|failure|policy|test|migration)"
            ))),
        }
    }
}

/// A framework constraint declared by a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameworkReq {
    pub name: String,
    /// Semver range such as `>=18, <20`. `None` accepts any version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}

impl FrameworkReq {
    #[must_use]
    pub fn new(name: &str, range: Option<&str>) -> Self {
        Self {
            name: name.to_lowercase(),
            range: range.map(str::to_string),
        }
    }

    /// Whether a query-side framework satisfies this constraint.
    ///
    /// Names compare case-insensitively. A missing range, a missing signal
    /// version, or an unparseable range all degrade to a name-only match.
    #[must_use]
    pub fn matches(&self, signal: &FrameworkSignal) -> bool {
        if !self.name.eq_ignore_ascii_case(&signal.name) {
            return false;
        }
        let (Some(range), Some(version)) = (self.range.as_deref(), signal.version.as_deref())
        else {
            return true;
        };
        let Ok(req) = VersionReq::parse(range) else {
            return true;
        };
        parse_lenient_version(version).is_none_or(|v| req.matches(&v))
    }
}

/// Parse `18`, `18.2`, `v18.2.0` and friends into a full semver version.
#[must_use]
pub fn parse_lenient_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches(['v', 'V', '^', '~', '=']);
    if let Ok(v) = Version::parse(trimmed) {
        return Some(v);
    }
    let mut parts = trimmed
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    parts.resize(3, 0);
    Some(Version::new(parts[0], parts[1], parts[2]))
}

/// Where a pattern applies. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternScope {
    /// Path globs, e.g. `src/api/**/*.ts`.
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<FrameworkReq>,
}

impl PatternScope {
    fn normalize(&mut self) {
        self.paths = normalize_set(
            self.paths.iter().map(|p| normalize_path(p)).collect(),
            false,
        );
        self.languages = normalize_set(std::mem::take(&mut self.languages), true);
        for fw in &mut self.frameworks {
            fw.name = fw.name.trim().to_lowercase();
        }
        self.frameworks.sort();
        self.frameworks.dedup();
    }
}

/// Trust inputs. The alpha/beta pair is owned by the evidence subsystem and
/// only read here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrustParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
}

impl TrustParams {
    #[must_use]
    pub const fn bayesian(alpha: f64, beta: f64) -> Self {
        Self {
            score: None,
            alpha: Some(alpha),
            beta: Some(beta),
        }
    }

    #[must_use]
    pub const fn scalar(score: f64) -> Self {
        Self {
            score: Some(score),
            alpha: None,
            beta: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
    /// Freshness half-life. Falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_life_days: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
}

/// Indexable projection of a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMeta {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PatternType,
    #[serde(default)]
    pub scope: PatternScope,
    #[serde(default)]
    pub trust: TrustParams,
    #[serde(default)]
    pub metadata: PatternMetadata,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PatternMeta {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: PatternType) -> Self {
        Self {
            id: id.into(),
            kind,
            scope: PatternScope::default(),
            trust: TrustParams::default(),
            metadata: PatternMetadata::default(),
            tags: Vec::new(),
        }
    }

    /// Check field ranges. Called once at the storage boundary.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(PatpackError::InvalidPattern("empty pattern id".to_string()));
        }
        if let Some(score) = self.trust.score {
            if !(0.0..=1.0).contains(&score) {
                return Err(PatpackError::InvalidPattern(format!(
                    "{}: trust score {score} outside [0, 1]",
                    self.id
                )));
            }
        }
        for (name, value) in [("alpha", self.trust.alpha), ("beta", self.trust.beta)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(PatpackError::InvalidPattern(format!(
                        "{}: {name} must be a non-negative number, got {v}",
                        self.id
                    )));
                }
            }
        }
        if let Some(h) = self.metadata.half_life_days {
            if !h.is_finite() || h <= 0.0 {
                return Err(PatpackError::InvalidPattern(format!(
                    "{}: half_life_days must be positive, got {h}",
                    self.id
                )));
            }
        }
        for glob in &self.scope.paths {
            glob::Pattern::new(glob).map_err(|err| {
                PatpackError::InvalidPattern(format!("{}: bad path glob {glob}: {err}", self.id))
            })?;
        }
        Ok(())
    }

    /// Canonicalize set-valued fields (sorted, deduplicated, languages lowercased).
    pub fn normalize(&mut self) {
        self.scope.normalize();
        self.tags = normalize_set(std::mem::take(&mut self.tags), true);
        if let Some(repo) = self.metadata.repo.as_mut() {
            *repo = repo.trim().to_string();
        }
        if let Some(org) = self.metadata.org.as_mut() {
            *org = org.trim().to_string();
        }
    }
}

/// Source location of a snippet within its original file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub path: String,
    /// 1-based first line of the excerpt in the original file.
    pub start_line: usize,
    pub end_line: usize,
    /// Line the excerpt was captured for, if narrower than the range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_line: Option<usize>,
}

impl SourceRef {
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}:{}-{}", self.path, self.start_line, self.end_line)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
}

impl Snippet {
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.code.lines().count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub success_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guidance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_insight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_use: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pitfalls: Vec<String>,
}

impl Guidance {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key_insight.is_none() && self.when_to_use.is_none() && self.pitfalls.is_empty()
    }
}

/// Full pattern body, loaded by id when a pack is assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    #[serde(flatten)]
    pub meta: PatternMeta,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub stats: UsageStats,
    #[serde(default, skip_serializing_if = "Guidance::is_empty")]
    pub guidance: Guidance,
    #[serde(default)]
    pub snippets: Vec<Snippet>,
    /// Free text. May embed `[POLICY:id]`, `[ANTI:id]` and `[TEST:id]` tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PatternRecord {
    #[must_use]
    pub fn new(meta: PatternMeta, title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            meta,
            title: title.into(),
            summary: summary.into(),
            stats: UsageStats::default(),
            guidance: Guidance::default(),
            snippets: Vec::new(),
            notes: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.meta.id
    }

    #[must_use]
    pub const fn kind(&self) -> PatternType {
        self.meta.kind
    }

    /// Most recent modification: `updated_at`, else the last review.
    #[must_use]
    pub fn last_touched(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.meta.metadata.last_reviewed)
    }

    /// The snippet with the fewest lines, ignoring empty ones.
    #[must_use]
    pub fn shortest_snippet(&self) -> Option<&Snippet> {
        self.snippets
            .iter()
            .filter(|s| !s.code.trim().is_empty())
            .min_by_key(|s| s.line_count())
    }

    pub fn validate(&self) -> Result<()> {
        self.meta.validate()?;
        for snippet in &self.snippets {
            if let Some(source) = &snippet.source {
                if source.start_line == 0 || source.end_line < source.start_line {
                    return Err(PatpackError::InvalidPattern(format!(
                        "{}: snippet range {} is not ordered",
                        self.meta.id,
                        source.reference()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn normalize_set(values: Vec<String>, lowercase: bool) -> Vec<String> {
    let mut out: Vec<String> = values
        .into_iter()
        .map(|v| {
            let v = v.trim();
            if lowercase { v.to_lowercase() } else { v.to_string() }
        })
        .filter(|v| !v.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}
