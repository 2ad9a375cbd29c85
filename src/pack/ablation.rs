//! Staged shrinking of an over-budget pack.
//!
//! Stages run in a fixed order and each one is skipped once the pack fits:
//!
//! 1. shrink every snippet to at most 12 lines
//! 2. shrink every snippet to at most 8 lines
//! 3. drop the lowest-scoring non-policy entries one at a time
//! 4. shorten every summary to 80 characters
//! 5. strip cross-references, then strip snippets lowest score first
//!
//! A stage is re-measured when it finishes. If it did not shrink the pack it
//! is rolled back, so sizes never grow between stages. Snippets are only ever
//! re-trimmed to fewer lines than they currently have.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::core::Snippet;
use crate::error::Result;

use super::budget::{BudgetManager, estimate};
use super::snippet::{SnippetTrimmer, content_hash};
use super::types::{CrossRefs, PackCandidate, PatternPack, SUMMARY_ABLATED_CHARS, truncate_summary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AblationStage {
    ShrinkSnippetsTo12,
    ShrinkSnippetsTo8,
    DropLowestScoring,
    ShortenSummaries,
    StripCrossRefs,
    StripSnippets,
}

impl AblationStage {
    pub const ORDER: [Self; 6] = [
        Self::ShrinkSnippetsTo12,
        Self::ShrinkSnippetsTo8,
        Self::DropLowestScoring,
        Self::ShortenSummaries,
        Self::StripCrossRefs,
        Self::StripSnippets,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AblationStep {
    pub stage: AblationStage,
    pub bytes_before: usize,
    pub bytes_after: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AblationReport {
    pub steps: Vec<AblationStep>,
    pub final_bytes: usize,
    pub within_budget: bool,
}

/// Measures a pack after refreshing whatever in `meta` depends on its
/// contents.
pub type Measure<'m> = dyn FnMut(&mut PatternPack) -> Result<usize> + 'm;

pub struct Ablator<'a> {
    trimmer: &'a SnippetTrimmer,
    /// Untrimmed snippet per entry id, for boundary-aware re-trimming.
    originals: &'a HashMap<String, Snippet>,
    budget: usize,
}

impl<'a> Ablator<'a> {
    #[must_use]
    pub const fn new(
        trimmer: &'a SnippetTrimmer,
        originals: &'a HashMap<String, Snippet>,
        budget: usize,
    ) -> Self {
        Self {
            trimmer,
            originals,
            budget,
        }
    }

    /// Shrink `pack` until it fits or every stage has run.
    pub fn run(&self, pack: &mut PatternPack, measure: &mut Measure<'_>) -> Result<AblationReport> {
        let mut report = AblationReport::default();
        let mut bytes = measure(pack)?;

        for stage in AblationStage::ORDER {
            if bytes <= self.budget {
                break;
            }
            let snapshot = pack.clone();
            self.apply(stage, pack, bytes, measure)?;
            let mut after = measure(pack)?;
            if after > bytes {
                *pack = snapshot;
                after = measure(pack)?;
            }
            info!(?stage, bytes_before = bytes, bytes_after = after, budget = self.budget, "ablation stage");
            report.steps.push(AblationStep {
                stage,
                bytes_before: bytes,
                bytes_after: after,
            });
            bytes = after;
        }

        report.final_bytes = bytes;
        report.within_budget = bytes <= self.budget;
        Ok(report)
    }

    fn apply(
        &self,
        stage: AblationStage,
        pack: &mut PatternPack,
        bytes: usize,
        measure: &mut Measure<'_>,
    ) -> Result<()> {
        match stage {
            AblationStage::ShrinkSnippetsTo12 => self.shrink_snippets(pack, 12),
            AblationStage::ShrinkSnippetsTo8 => self.shrink_snippets(pack, 8),
            AblationStage::DropLowestScoring => return self.drop_lowest(pack, bytes, measure),
            AblationStage::ShortenSummaries => shorten_summaries(pack),
            AblationStage::StripCrossRefs => {
                for entry in pack.entries_mut() {
                    entry.refs = CrossRefs::default();
                }
            }
            AblationStage::StripSnippets => return self.strip_snippets(pack, bytes, measure),
        }
        Ok(())
    }

    fn shrink_snippets(&self, pack: &mut PatternPack, limit: usize) {
        for entry in pack.entries_mut() {
            let Some(current) = entry.snippet.as_ref() else {
                continue;
            };
            let lines = current.line_count();
            if lines <= limit {
                continue;
            }
            let reshaped = self
                .originals
                .get(&entry.id)
                .and_then(|original| self.trimmer.trim(original, limit.min(lines)))
                .filter(|t| t.lines < lines)
                .map(|t| t.to_pack());
            entry.snippet = Some(reshaped.unwrap_or_else(|| {
                let mut head = current.clone();
                head.code = current.code.lines().take(limit).collect::<Vec<_>>().join("\n");
                head.id = content_hash(&head.code);
                head
            }));
        }
    }

    fn drop_lowest(&self, pack: &mut PatternPack, mut bytes: usize, measure: &mut Measure<'_>) -> Result<()> {
        while bytes > self.budget {
            let Some((list, index)) = lowest_entry(pack) else {
                break;
            };
            let entries = entry_list(pack, list);
            let removed = entries.remove(index);
            let cost = BudgetManager::append_cost(estimate(&removed)?, entries.len());
            debug!(id = %removed.id, score = removed.score, "ablation dropped entry");
            bytes = bytes.saturating_sub(cost);
            if bytes <= self.budget {
                bytes = measure(pack)?;
            }
        }
        Ok(())
    }

    fn strip_snippets(&self, pack: &mut PatternPack, mut bytes: usize, measure: &mut Measure<'_>) -> Result<()> {
        let mut order: Vec<(f64, String)> = pack
            .entries()
            .filter(|e| e.snippet.is_some())
            .map(|e| (e.score, e.id.clone()))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| b.1.cmp(&a.1)));

        for (_, id) in order {
            if bytes <= self.budget {
                break;
            }
            if let Some(entry) = pack.entries_mut().find(|e| e.id == id) {
                entry.snippet = None;
            }
            bytes = measure(pack)?;
        }
        Ok(())
    }
}

fn shorten_summaries(pack: &mut PatternPack) {
    for policy in &mut pack.policies {
        policy.summary = truncate_summary(&policy.summary, SUMMARY_ABLATED_CHARS);
    }
    for entry in pack.entries_mut() {
        entry.summary = truncate_summary(&entry.summary, SUMMARY_ABLATED_CHARS);
    }
}

#[derive(Debug, Clone, Copy)]
enum EntryList {
    Candidates,
    AntiPatterns,
    Tests,
}

fn entry_list(pack: &mut PatternPack, list: EntryList) -> &mut Vec<PackCandidate> {
    match list {
        EntryList::Candidates => &mut pack.candidates,
        EntryList::AntiPatterns => &mut pack.anti_patterns,
        EntryList::Tests => &mut pack.tests,
    }
}

/// Lowest score across the non-policy lists. Ties drop the larger id first.
fn lowest_entry(pack: &PatternPack) -> Option<(EntryList, usize)> {
    let lists = [
        (EntryList::Candidates, &pack.candidates),
        (EntryList::AntiPatterns, &pack.anti_patterns),
        (EntryList::Tests, &pack.tests),
    ];
    lists
        .into_iter()
        .flat_map(|(list, entries)| entries.iter().enumerate().map(move |(i, e)| (list, i, e)))
        .min_by(|a, b| a.2.score.total_cmp(&b.2.score).then_with(|| b.2.id.cmp(&a.2.id)))
        .map(|(list, index, _)| (list, index))
}
