//! Query-time context signals.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::paths::normalize_path;

/// A framework in use by the task, with an optional concrete version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameworkSignal {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl FrameworkSignal {
    #[must_use]
    pub fn new(name: &str, version: Option<&str>) -> Self {
        Self {
            name: name.to_lowercase(),
            version: version.map(str::to_string),
        }
    }
}

/// Task context used to rank patterns. Immutable for the duration of a call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    /// Candidate file paths, most relevant first.
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<FrameworkSignal>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
}

impl Signals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages
            .into_iter()
            .map(|l| l.into().to_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn with_framework(mut self, name: &str, version: Option<&str>) -> Self {
        self.frameworks.push(FrameworkSignal::new(name, version));
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(|t| t.into().to_lowercase()).collect();
        self
    }

    #[must_use]
    pub fn with_repo(mut self, repo: &str) -> Self {
        self.repo = Some(repo.to_string());
        self
    }

    #[must_use]
    pub fn with_org(mut self, org: &str) -> Self {
        self.org = Some(org.to_string());
        self
    }

    /// Copy with every list sorted and deduplicated and case folded where
    /// matching is case-insensitive. Two signal sets that differ only in list
    /// order normalize to the same value.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut paths: Vec<String> = self.paths.iter().map(|p| normalize_path(p)).collect();
        paths.retain(|p| !p.is_empty());
        paths.sort();
        paths.dedup();

        let mut languages: Vec<String> = self
            .languages
            .iter()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        languages.sort();
        languages.dedup();

        let mut frameworks: Vec<FrameworkSignal> = self
            .frameworks
            .iter()
            .map(|f| FrameworkSignal {
                name: f.name.trim().to_lowercase(),
                version: f.version.as_ref().map(|v| v.trim().to_string()),
            })
            .collect();
        frameworks.sort();
        frameworks.dedup();

        let mut tags: Vec<String> = self.tags.iter().map(|t| t.trim().to_lowercase()).collect();
        tags.retain(|t| !t.is_empty());
        tags.sort();
        tags.dedup();

        Self {
            paths,
            languages,
            frameworks,
            tags,
            repo: self.repo.as_ref().map(|r| r.trim().to_string()),
            org: self.org.as_ref().map(|o| o.trim().to_string()),
        }
    }

    /// Deterministic cache key over the normalized signals.
    ///
    /// `salt` folds in anything else the result depends on (top-K, config
    /// fingerprint).
    #[must_use]
    pub fn cache_key(&self, salt: u64) -> u64 {
        let normalized = self.normalized();
        let mut hasher = DefaultHasher::new();
        normalized.hash(&mut hasher);
        salt.hash(&mut hasher);
        hasher.finish()
    }
}

impl Hash for Signals {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.paths.hash(state);
        self.languages.hash(state);
        self.frameworks.hash(state);
        self.tags.hash(state);
        self.repo.hash(state);
        self.org.hash(state);
    }
}
