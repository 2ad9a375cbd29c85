//! Inclusion bookkeeping for pack assembly.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::types::CrossRefs;

static CROSS_REF: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[(POLICY|ANTI|TEST):\s*([^\]\s]+)\s*\]").ok());

/// Kind of item a cross-reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Policy,
    AntiPattern,
    Test,
}

/// Collect `[POLICY:id]`, `[ANTI:id]` and `[TEST:id]` tokens from free text.
/// Ids keep first-seen order without duplicates.
#[must_use]
pub fn parse_cross_refs(notes: &str) -> CrossRefs {
    let mut refs = CrossRefs::default();
    let Some(re) = CROSS_REF.as_ref() else {
        return refs;
    };
    for caps in re.captures_iter(notes) {
        let id = caps[2].to_string();
        let list = match &caps[1] {
            "POLICY" => &mut refs.policies,
            "ANTI" => &mut refs.anti_patterns,
            _ => &mut refs.tests,
        };
        if !list.contains(&id) {
            list.push(id);
        }
    }
    refs
}

/// Tracks what a pack already holds so nothing is listed twice.
#[derive(Debug, Default, Clone)]
pub struct Deduper {
    ids: HashSet<String>,
    snippets: HashSet<String>,
    policies: HashSet<String>,
    anti_patterns: HashSet<String>,
    tests: HashSet<String>,
}

impl Deduper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_included(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns false if `id` was already included.
    pub fn mark_included(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    pub fn unmark_included(&mut self, id: &str) {
        self.ids.remove(id);
    }

    #[must_use]
    pub fn has_snippet(&self, hash: &str) -> bool {
        self.snippets.contains(hash)
    }

    /// Returns false if an identical snippet was already included.
    pub fn mark_snippet(&mut self, hash: &str) -> bool {
        self.snippets.insert(hash.to_string())
    }

    /// Remember the ids an included candidate references inline.
    pub fn add_refs(&mut self, refs: &CrossRefs) {
        self.policies.extend(refs.policies.iter().cloned());
        self.anti_patterns.extend(refs.anti_patterns.iter().cloned());
        self.tests.extend(refs.tests.iter().cloned());
    }

    #[must_use]
    pub fn is_referenced(&self, kind: RefKind, id: &str) -> bool {
        match kind {
            RefKind::Policy => self.policies.contains(id),
            RefKind::AntiPattern => self.anti_patterns.contains(id),
            RefKind::Test => self.tests.contains(id),
        }
    }

    /// Included directly or referenced by something included.
    #[must_use]
    pub fn is_covered(&self, kind: RefKind, id: &str) -> bool {
        self.is_included(id) || self.is_referenced(kind, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_token_kinds_once() {
        let refs = parse_cross_refs(
            "See [POLICY:no-secrets] and [ANTI:god-object]. Also [TEST: table-tests] [POLICY:no-secrets] [OTHER:x]",
        );
        assert_eq!(refs.policies, vec!["no-secrets"]);
        assert_eq!(refs.anti_patterns, vec!["god-object"]);
        assert_eq!(refs.tests, vec!["table-tests"]);
    }

    #[test]
    fn plain_text_has_no_refs() {
        assert!(parse_cross_refs("nothing [here] at all").is_empty());
    }

    #[test]
    fn inclusion_and_reference_tracking() {
        let mut dedup = Deduper::new();
        assert!(dedup.mark_included("a"));
        assert!(!dedup.mark_included("a"));
        assert!(dedup.mark_snippet("abcd1234"));
        assert!(dedup.has_snippet("abcd1234"));

        dedup.add_refs(&parse_cross_refs("[ANTI:x] [TEST:y]"));
        assert!(dedup.is_referenced(RefKind::AntiPattern, "x"));
        assert!(!dedup.is_referenced(RefKind::Test, "x"));
        assert!(dedup.is_covered(RefKind::Test, "y"));
        assert!(dedup.is_covered(RefKind::Policy, "a"));

        dedup.unmark_included("a");
        assert!(!dedup.is_included("a"));
    }
}
