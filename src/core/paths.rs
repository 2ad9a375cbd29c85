//! Path and glob helpers shared by prefiltering and scoring.

use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Forward slashes, no leading `./` or `/`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let replaced = path.trim().replace('\\', "/");
    let mut trimmed = replaced.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.trim_start_matches('/').to_string()
}

/// Path components, empty components dropped.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty() && *s != ".")
}

fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{'])
}

/// Leading components of a glob that contain no wildcard.
///
/// `src/api/**/*.ts` yields `["src", "api"]`; `**/*.ts` yields nothing. A
/// glob without any wildcard is a literal path and yields every component.
#[must_use]
pub fn literal_prefix(glob: &str) -> Vec<&str> {
    segments(glob).take_while(|s| !has_wildcard(s)).collect()
}

/// Compiled glob. Invalid globs never match (they are rejected at load time).
#[derive(Debug, Clone)]
pub struct PathGlob {
    source: String,
    pattern: Option<Pattern>,
}

impl PathGlob {
    #[must_use]
    pub fn new(glob: &str) -> Self {
        let source = normalize_path(glob);
        let pattern = Pattern::new(&source).ok();
        Self { source, pattern }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match a normalized path. A directory glob (`src/api`) also matches
    /// anything under it.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let Some(pattern) = &self.pattern else {
            return false;
        };
        if pattern.matches_with(path, MATCH_OPTIONS) {
            return true;
        }
        !has_wildcard(&self.source)
            && path
                .strip_prefix(self.source.trim_end_matches('/'))
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Compile every glob of a scope once.
#[must_use]
pub fn compile_all(globs: &[String]) -> Vec<PathGlob> {
    globs.iter().map(|g| PathGlob::new(g)).collect()
}

/// Number of leading directory components two paths share.
#[must_use]
pub fn shared_prefix_len<'a>(
    a: impl IntoIterator<Item = &'a str>,
    b: impl IntoIterator<Item = &'a str>,
) -> usize {
    a.into_iter().zip(b).take_while(|(x, y)| x == y).count()
}
