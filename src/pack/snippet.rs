//! Boundary-aware snippet trimming.
//!
//! Given an excerpt and the line it was captured for, prefer the enclosing
//! declaration (found by scanning upward for a declaration line, then
//! forward by brace balance or indentation) plus a few lines of margin. If
//! that is still too long, fall back to a window of the target size centered
//! on the requested line. Results are memoized per trimmer.

use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::core::{Snippet, SourceRef};

use super::types::PackSnippet;

/// Default lines of context kept around a detected block.
pub const DEFAULT_CONTEXT_MARGIN: usize = 6;

static DECLARATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(concat!(
        // fn/def/class/func/... with optional modifiers (Rust, Python, Go, TS, Kotlin, Swift)
        r"^\s*(?:(?:pub(?:\([^)]*\))?|export|default|async|static|public|private|protected|internal|abstract|final|override|unsafe|const|extern)\s+)*",
        r"(?:fn|def|class|function|func|impl|struct|enum|trait|interface|module|mod|fun)\b",
        // const handler = async (req) => {
        r"|^\s*(?:export\s+)?(?:const|let|var)\s+\w+\s*=\s*(?:async\s*)?(?:\([^)]*\)|\w+)\s*=>",
        // public static void main(String[] args) {
        r"|^\s*(?:(?:public|private|protected|static|final|synchronized|virtual)\s+)+[\w<>\[\],\s]+\s+\w+\s*\([^;]*$",
    ))
    .ok()
});

/// Content id: first 8 hex chars of the SHA-256 digest.
#[must_use]
pub fn content_hash(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(8);
    hex
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedSnippet {
    pub id: String,
    pub lang: String,
    pub code: String,
    pub lines: usize,
    /// `path:start-end` of the kept lines, when the source is known.
    pub source: Option<String>,
}

impl TrimmedSnippet {
    #[must_use]
    pub fn to_pack(&self) -> PackSnippet {
        PackSnippet {
            id: self.id.clone(),
            lang: self.lang.clone(),
            code: self.code.clone(),
            source: self.source.clone(),
        }
    }
}

/// Source reference, code hash, focus index, target lines.
type TrimKey = (String, String, usize, usize);

#[derive(Debug)]
pub struct SnippetTrimmer {
    margin: usize,
    memo: Mutex<HashMap<TrimKey, TrimmedSnippet>>,
}

impl Default for SnippetTrimmer {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_MARGIN)
    }
}

impl SnippetTrimmer {
    #[must_use]
    pub fn new(margin: usize) -> Self {
        Self {
            margin,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Trim `snippet` to at most `target_lines` lines. `None` when the
    /// snippet has no code or the target is zero.
    pub fn trim(&self, snippet: &Snippet, target_lines: usize) -> Option<TrimmedSnippet> {
        if snippet.code.trim().is_empty() || target_lines == 0 {
            return None;
        }

        // Equal source refs may still carry different code across repos.
        let reference = snippet.source.as_ref().map(SourceRef::reference).unwrap_or_default();
        let lines: Vec<&str> = snippet.code.lines().collect();
        let focus = focus_index(snippet, lines.len());
        let key = (reference, content_hash(&snippet.code), focus, target_lines);

        if let Some(hit) = self.memo.lock().get(&key) {
            return Some(hit.clone());
        }

        let (start, end) = select_window(&lines, focus, target_lines, self.margin);
        let code = lines[start..end].join("\n");
        let source = snippet.source.as_ref().map(|s| {
            format!(
                "{}:{}-{}",
                s.path,
                s.start_line + start,
                s.start_line + end.saturating_sub(1)
            )
        });
        let trimmed = TrimmedSnippet {
            id: content_hash(&code),
            lang: snippet.lang.clone(),
            lines: end - start,
            code,
            source,
        };

        self.memo.lock().insert(key, trimmed.clone());
        Some(trimmed)
    }

    #[must_use]
    pub fn memoized(&self) -> usize {
        self.memo.lock().len()
    }
}

/// Index of the requested line within the excerpt.
fn focus_index(snippet: &Snippet, len: usize) -> usize {
    let last = len.saturating_sub(1);
    snippet
        .source
        .as_ref()
        .and_then(|s| s.focus_line.map(|f| f.saturating_sub(s.start_line)))
        .unwrap_or(0)
        .min(last)
}

/// Half-open line range to keep.
fn select_window(lines: &[&str], focus: usize, target: usize, margin: usize) -> (usize, usize) {
    let n = lines.len();
    if n <= target {
        return (0, n);
    }

    if let Some((decl, close)) = enclosing_block(lines, focus) {
        let block_end = close + 1;
        let block_len = block_end - decl;
        if block_len <= target {
            let spare = target - block_len;
            let room_before = margin.min(decl);
            let room_after = margin.min(n - block_end);
            let before = room_before.min(spare.div_ceil(2));
            let after = room_after.min(spare - before);
            let before = room_before.min(spare - after);
            return (decl - before, block_end + after);
        }
    }

    centered(focus, target, n)
}

fn centered(focus: usize, target: usize, n: usize) -> (usize, usize) {
    let start = focus.saturating_sub(target / 2).min(n - target);
    (start, start + target)
}

/// Declaration line and closing line of the block enclosing `focus`.
fn enclosing_block(lines: &[&str], focus: usize) -> Option<(usize, usize)> {
    let re = DECLARATION.as_ref()?;
    let decl = (0..=focus).rev().find(|&i| re.is_match(lines[i]))?;

    let opens_brace = lines[decl..lines.len().min(decl + 3)]
        .iter()
        .any(|line| line.contains('{'));
    let close = if opens_brace {
        brace_close(lines, decl)?
    } else {
        indent_close(lines, decl)
    };
    (close >= focus).then_some((decl, close))
}

fn brace_close(lines: &[&str], decl: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut opened = false;
    for (i, line) in lines.iter().enumerate().skip(decl) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        if opened && depth == 0 {
            return Some(i);
        }
    }
    None
}

fn indent_close(lines: &[&str], decl: usize) -> usize {
    let indent = |line: &str| line.len() - line.trim_start().len();
    let base = indent(lines[decl]);
    let mut close = decl;
    for (i, line) in lines.iter().enumerate().skip(decl + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent(line) <= base {
            break;
        }
        close = i;
    }
    close
}
