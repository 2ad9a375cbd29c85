//! The pattern pack artifact and its entries.

use serde::{Deserialize, Serialize};

use crate::core::PatternType;
use crate::ranking::RankedPattern;

/// Longest summary kept in a pack entry.
pub const SUMMARY_MAX_CHARS: usize = 120;

/// Summary length after the ablation shortening stage.
pub const SUMMARY_ABLATED_CHARS: usize = 80;

/// Size-bounded bundle of the most relevant patterns for one task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternPack {
    pub task: String,
    #[serde(default)]
    pub candidates: Vec<PackCandidate>,
    #[serde(default)]
    pub anti_patterns: Vec<PackCandidate>,
    #[serde(default)]
    pub policies: Vec<PackPolicy>,
    #[serde(default)]
    pub tests: Vec<PackCandidate>,
    pub meta: PackMeta,
}

impl PatternPack {
    #[must_use]
    pub fn new(task: impl Into<String>, budget_bytes: usize) -> Self {
        Self {
            task: task.into(),
            meta: PackMeta {
                budget_bytes,
                ..PackMeta::default()
            },
            ..Self::default()
        }
    }

    /// Entries across all four lists.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.candidates.len() + self.anti_patterns.len() + self.policies.len() + self.tests.len()
    }

    /// Ids of every included entry, policies first.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.policies
            .iter()
            .map(|p| p.id.as_str())
            .chain(self.candidates.iter().map(|c| c.id.as_str()))
            .chain(self.anti_patterns.iter().map(|c| c.id.as_str()))
            .chain(self.tests.iter().map(|c| c.id.as_str()))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids().any(|included| included == id)
    }

    /// Every non-policy entry across the three entry lists.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut PackCandidate> {
        self.candidates
            .iter_mut()
            .chain(self.anti_patterns.iter_mut())
            .chain(self.tests.iter_mut())
    }

    pub fn entries(&self) -> impl Iterator<Item = &PackCandidate> {
        self.candidates
            .iter()
            .chain(self.anti_patterns.iter())
            .chain(self.tests.iter())
    }

    /// Bring the counters in `meta` in line with the lists. `bytes` is left
    /// to the serializer.
    pub fn refresh_counts(&mut self) {
        self.meta.included = self.entry_count();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackMeta {
    /// Patterns handed to the builder by the ranker.
    pub total_ranked: usize,
    /// Ranked patterns whose bodies could be loaded.
    pub considered: usize,
    pub included: usize,
    /// Size of the canonical serialization, this field included.
    pub bytes: usize,
    pub budget_bytes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<Vec<ExplainRow>>,
}

/// Policies carry only an id and a truncated summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackPolicy {
    pub id: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackCandidate {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PatternType,
    pub title: String,
    pub score: f64,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_insight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_use: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pitfalls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<PackSnippet>,
    #[serde(default, skip_serializing_if = "CrossRefs::is_empty")]
    pub refs: CrossRefs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSnippet {
    /// First 8 hex chars of the SHA-256 of `code`.
    pub id: String,
    pub lang: String,
    pub code: String,
    /// `path:start-end` of the trimmed excerpt in its original file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl PackSnippet {
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.code.lines().count()
    }
}

/// Ids a candidate already implies, parsed from `[POLICY:..]`, `[ANTI:..]`
/// and `[TEST:..]` tokens in its notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossRefs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anti_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<String>,
}

impl CrossRefs {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty() && self.anti_patterns.is_empty() && self.tests.is_empty()
    }
}

/// Per-pattern score breakdown attached in debug mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainRow {
    pub id: String,
    pub score: f64,
    pub scope: f64,
    pub trust: f64,
    pub freshness: f64,
    pub locality: f64,
    pub policy: f64,
}

impl From<&RankedPattern> for ExplainRow {
    fn from(ranked: &RankedPattern) -> Self {
        Self {
            id: ranked.id.clone(),
            score: round2(ranked.score),
            scope: round2(ranked.explain.scope.points),
            trust: round2(ranked.explain.trust.points),
            freshness: round2(ranked.explain.freshness.points),
            locality: round2(ranked.explain.locality.points),
            policy: round2(ranked.explain.policy.points),
        }
    }
}

/// Two decimal places. Keeps serialized numbers short and stable.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Cut `text` to at most `max_chars` characters, ending in `...` when cut.
#[must_use]
pub fn truncate_summary(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept.trim_end())
}
