//! Pattern and corpus builders for tests and benches.

use chrono::{DateTime, Duration, Utc};

use crate::core::{
    FrameworkReq, PatternMeta, PatternRecord, PatternType, Snippet, SourceRef, TrustParams,
};
use crate::ranking::RankedPattern;
use crate::scoring::{ScoreBreakdown, ScoreComponent};

/// Fluent builder for a full [`PatternRecord`].
#[derive(Debug, Clone)]
pub struct PatternBuilder {
    record: PatternRecord,
}

impl PatternBuilder {
    #[must_use]
    pub fn new(id: &str, kind: PatternType) -> Self {
        let meta = PatternMeta::new(id, kind);
        Self {
            record: PatternRecord::new(meta, format!("Pattern {id}"), format!("How {id} works")),
        }
    }

    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.record.title = title.to_string();
        self
    }

    #[must_use]
    pub fn summary(mut self, summary: &str) -> Self {
        self.record.summary = summary.to_string();
        self
    }

    #[must_use]
    pub fn paths(mut self, paths: &[&str]) -> Self {
        self.record.meta.scope.paths = paths.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn languages(mut self, languages: &[&str]) -> Self {
        self.record.meta.scope.languages = languages.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn framework(mut self, name: &str, range: Option<&str>) -> Self {
        self.record.meta.scope.frameworks.push(FrameworkReq::new(name, range));
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.record.meta.tags = tags.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn trust(mut self, alpha: f64, beta: f64) -> Self {
        self.record.meta.trust = TrustParams::bayesian(alpha, beta);
        self
    }

    #[must_use]
    pub fn trust_score(mut self, score: f64) -> Self {
        self.record.meta.trust = TrustParams::scalar(score);
        self
    }

    #[must_use]
    pub fn reviewed(mut self, at: DateTime<Utc>) -> Self {
        self.record.meta.metadata.last_reviewed = Some(at);
        self
    }

    #[must_use]
    pub fn reviewed_days_ago(self, now: DateTime<Utc>, days: i64) -> Self {
        self.reviewed(now - Duration::days(days))
    }

    #[must_use]
    pub const fn half_life(mut self, days: f64) -> Self {
        self.record.meta.metadata.half_life_days = Some(days);
        self
    }

    #[must_use]
    pub fn owner(mut self, repo: Option<&str>, org: Option<&str>) -> Self {
        self.record.meta.metadata.repo = repo.map(str::to_string);
        self.record.meta.metadata.org = org.map(str::to_string);
        self
    }

    #[must_use]
    pub fn updated(mut self, at: DateTime<Utc>) -> Self {
        self.record.updated_at = Some(at);
        self
    }

    #[must_use]
    pub const fn usage(mut self, uses: u64, successes: u64) -> Self {
        self.record.stats.usage_count = uses;
        self.record.stats.success_count = successes;
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: &str) -> Self {
        self.record.notes = Some(notes.to_string());
        self
    }

    #[must_use]
    pub fn key_insight(mut self, insight: &str) -> Self {
        self.record.guidance.key_insight = Some(insight.to_string());
        self
    }

    /// Attach a snippet of `lines` numbered statements taken from `path`.
    #[must_use]
    pub fn snippet_lines(mut self, path: &str, lines: usize) -> Self {
        let code = (1..=lines)
            .map(|i| format!("    apply_step_{i}(&mut state);"))
            .collect::<Vec<_>>()
            .join("\n");
        self.record.snippets.push(Snippet {
            lang: "rust".into(),
            code,
            source: Some(SourceRef {
                path: path.to_string(),
                start_line: 1,
                end_line: lines.max(1),
                focus_line: None,
            }),
        });
        self
    }

    #[must_use]
    pub fn snippet(mut self, snippet: Snippet) -> Self {
        self.record.snippets.push(snippet);
        self
    }

    #[must_use]
    pub fn build(self) -> PatternRecord {
        self.record
    }

    #[must_use]
    pub fn meta(self) -> PatternMeta {
        self.record.meta
    }
}

/// A ranked entry with the given trust points and nothing else in its
/// breakdown.
#[must_use]
pub fn ranked(id: &str, score: f64) -> RankedPattern {
    RankedPattern {
        id: id.to_string(),
        score,
        explain: ScoreBreakdown {
            trust: ScoreComponent::new(0.5, 0.5),
            ..ScoreBreakdown::default()
        },
    }
}

/// Deterministic synthetic corpus of `size` patterns spread over a few
/// languages, frameworks, path roots and all pattern types.
#[must_use]
pub fn sample_corpus(size: usize, now: DateTime<Utc>) -> Vec<PatternRecord> {
    const LANGS: [&str; 4] = ["rust", "typescript", "python", "go"];
    const ROOTS: [&str; 5] = ["src/api", "src/db", "web/components", "tests", "scripts"];
    const FRAMEWORKS: [(&str, &str); 3] = [("react", ">=18"), ("axum", "^0.7"), ("django", ">=4, <6")];

    (0..size)
        .map(|i| {
            let kind = PatternType::ALL[i % PatternType::ALL.len()];
            let mut builder = PatternBuilder::new(&format!("p-{i:05}"), kind)
                .summary(&format!("Synthetic pattern {i} covering {}", ROOTS[i % ROOTS.len()]))
                .trust((i % 17) as f64, (i % 5) as f64)
                .reviewed_days_ago(now, (i % 400) as i64)
                .usage((i % 50) as u64, (i % 37) as u64);
            if i % 3 != 0 {
                builder = builder.languages(&[LANGS[i % LANGS.len()]]);
            }
            if i % 4 != 0 {
                builder = builder.paths(&[&format!("{}/**/*.rs", ROOTS[i % ROOTS.len()])]);
            }
            if i % 5 == 0 {
                let (name, range) = FRAMEWORKS[i % FRAMEWORKS.len()];
                builder = builder.framework(name, Some(range));
            }
            if i % 2 == 0 {
                builder = builder.snippet_lines(&format!("{}/mod_{i}.rs", ROOTS[i % ROOTS.len()]), 6 + i % 30);
            }
            builder.build()
        })
        .collect()
}
