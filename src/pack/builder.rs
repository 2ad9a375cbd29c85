//! Phased, budget-bound pack assembly.
//!
//! Phases run in a fixed order against one shared budget and dedup state:
//! policies, top candidates, recent failures, one anti-pattern, one test,
//! then a score-ordered fill. Every non-policy entry tries a snippet at the
//! initial line target, then at the minimum target, then no snippet at all
//! before it is given up. If the measured pack is still over budget the
//! ablation stages take over.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::{PackConfig, PackOverrides};
use crate::core::{PatternRecord, PatternType, Snippet};
use crate::error::Result;
use crate::ranking::RankedPattern;
use crate::storage::PatternRepository;

use super::ablation::{AblationReport, Ablator};
use super::budget::{BudgetManager, estimate};
use super::dedup::{Deduper, RefKind, parse_cross_refs};
use super::serializer::PackSerializer;
use super::snippet::SnippetTrimmer;
use super::types::{
    CrossRefs, ExplainRow, PackCandidate, PackPolicy, PackSnippet, PatternPack, SUMMARY_MAX_CHARS,
    round2, truncate_summary,
};

/// A finished pack with its canonical text and what ablation did to it.
#[derive(Debug, Clone)]
pub struct PackBuild {
    pub pack: PatternPack,
    pub canonical: String,
    pub ablation: AblationReport,
}

impl PackBuild {
    #[must_use]
    pub const fn within_budget(&self) -> bool {
        self.pack.meta.bytes <= self.pack.meta.budget_bytes
    }
}

pub struct PackBuilder {
    repo: Arc<dyn PatternRepository>,
    config: PackConfig,
    trimmer: SnippetTrimmer,
    now: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for PackBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackBuilder")
            .field("config", &self.config)
            .field("memoized_snippets", &self.trimmer.memoized())
            .finish_non_exhaustive()
    }
}

impl PackBuilder {
    #[must_use]
    pub fn new(repo: Arc<dyn PatternRepository>, config: PackConfig) -> Self {
        let trimmer = SnippetTrimmer::new(config.context_margin_lines);
        Self {
            repo,
            config,
            trimmer,
            now: None,
        }
    }

    /// Per-call overrides layered over the configured pack settings.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &PackOverrides) -> Self {
        self.config = overrides.apply(&self.config);
        self
    }

    /// Pin the clock used for the failure recency window.
    #[must_use]
    pub const fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &PackConfig {
        &self.config
    }

    pub fn build(&self, task: &str, ranked: &[RankedPattern]) -> Result<PatternPack> {
        Ok(self.assemble(task, ranked)?.pack)
    }

    pub fn assemble(&self, task: &str, ranked: &[RankedPattern]) -> Result<PackBuild> {
        let loaded = self.load(ranked);
        let mut pack = PatternPack::new(task, self.config.budget_bytes);
        pack.meta.total_ranked = ranked.len();
        pack.meta.considered = loaded.len();
        if self.config.debug_explain {
            pack.meta.explain = Some(Vec::new());
        }

        let rows: HashMap<String, ExplainRow> = if self.config.debug_explain {
            loaded
                .iter()
                .map(|item| (item.ranked.id.clone(), ExplainRow::from(item.ranked)))
                .collect()
        } else {
            HashMap::new()
        };

        let mut assembly = Assembly::start(pack, &self.config, &rows, ranked.len())?;
        self.run_phases(&mut assembly, &loaded)?;

        let Assembly {
            mut pack,
            originals,
            ..
        } = assembly;

        let mut measure = |p: &mut PatternPack| -> Result<usize> {
            sync_explain(p, &rows);
            PackSerializer::finalize(p)?;
            Ok(p.meta.bytes)
        };
        let ablation = Ablator::new(&self.trimmer, &originals, self.config.budget_bytes)
            .run(&mut pack, &mut measure)?;

        sync_explain(&mut pack, &rows);
        let canonical = PackSerializer::finalize(&mut pack)?;
        if !ablation.within_budget {
            warn!(
                bytes = pack.meta.bytes,
                budget = pack.meta.budget_bytes,
                "pack exceeds budget after every ablation stage"
            );
        }
        match PackSerializer::compressed_size(&pack) {
            Ok(compressed) => debug!(bytes = pack.meta.bytes, compressed, "pack compressed size"),
            Err(err) => debug!(error = %err, "compressed size unavailable"),
        }
        info!(
            task,
            ranked = pack.meta.total_ranked,
            considered = pack.meta.considered,
            included = pack.meta.included,
            bytes = pack.meta.bytes,
            budget = pack.meta.budget_bytes,
            "pack assembled"
        );

        Ok(PackBuild {
            pack,
            canonical,
            ablation,
        })
    }

    fn load<'r>(&self, ranked: &'r [RankedPattern]) -> Vec<Loaded<'r>> {
        let mut loaded = Vec::with_capacity(ranked.len());
        for item in ranked {
            match self.repo.load(&item.id) {
                Ok(Some(record)) => {
                    let refs = record.notes.as_deref().map(parse_cross_refs).unwrap_or_default();
                    loaded.push(Loaded {
                        ranked: item,
                        record,
                        refs,
                    });
                }
                Ok(None) => warn!(id = %item.id, "ranked pattern has no loadable body; skipping"),
                Err(err) => warn!(id = %item.id, error = %err, "failed to load ranked pattern; skipping"),
            }
        }
        // Every phase walks this order, so quotas and fill see the best first.
        loaded.sort_by(|a, b| {
            let (a, b) = (a.ranked, b.ranked);
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.explain.scope.points.total_cmp(&a.explain.scope.points))
                .then_with(|| b.explain.trust.points.total_cmp(&a.explain.trust.points))
                .then_with(|| a.id.cmp(&b.id))
        });
        loaded
    }

    fn run_phases(&self, assembly: &mut Assembly<'_>, loaded: &[Loaded<'_>]) -> Result<()> {
        let cfg = &self.config;
        let now = self.now.unwrap_or_else(Utc::now);
        let failure_cutoff = now - Duration::days(cfg.failure_window_days);

        // Policies are mandatory and may overflow the budget on their own.
        for item in loaded.iter().filter(|i| i.kind() == PatternType::Policy) {
            assembly.add_policy(item)?;
        }
        debug!(policies = assembly.pack.policies.len(), used = assembly.budget.used(), "policy phase");

        let mut added = 0;
        for item in loaded
            .iter()
            .filter(|i| i.kind().is_solution() && i.ranked.score >= cfg.top_score_threshold)
        {
            if added >= cfg.top_candidates_quota {
                break;
            }
            if self.add_entry(assembly, item, EntryList::Candidates)? {
                added += 1;
            }
        }
        debug!(added, used = assembly.budget.used(), "top candidate phase");

        let mut added = 0;
        for item in loaded.iter().filter(|i| {
            i.kind() == PatternType::Failure
                && i.record.last_touched().is_some_and(|t| t >= failure_cutoff)
        }) {
            if added >= cfg.failures_quota {
                break;
            }
            if self.add_entry(assembly, item, EntryList::Candidates)? {
                added += 1;
            }
        }
        debug!(added, used = assembly.budget.used(), "failure phase");

        for (kind, ref_kind, list, quota) in [
            (PatternType::AntiPattern, RefKind::AntiPattern, EntryList::AntiPatterns, cfg.antis_quota),
            (PatternType::Test, RefKind::Test, EntryList::Tests, cfg.tests_quota),
        ] {
            let mut added = 0;
            for item in loaded.iter().filter(|i| i.kind() == kind) {
                if added >= quota {
                    break;
                }
                if assembly.dedup.is_covered(ref_kind, item.id()) {
                    debug!(id = item.id(), "already referenced by an included candidate");
                    continue;
                }
                if self.add_entry(assembly, item, list)? {
                    added += 1;
                }
            }
            debug!(?kind, added, used = assembly.budget.used(), "quota phase");
        }

        let mut filled = 0;
        for item in loaded
            .iter()
            .filter(|i| i.kind().is_solution() || i.kind() == PatternType::Failure)
        {
            if assembly.dedup.is_included(item.id()) {
                continue;
            }
            if self.add_entry(assembly, item, EntryList::Candidates)? {
                filled += 1;
            }
        }
        debug!(filled, used = assembly.budget.used(), "fill phase");
        Ok(())
    }

    /// Try the snippet ladder for one entry. Returns whether it was added.
    fn add_entry(&self, assembly: &mut Assembly<'_>, item: &Loaded<'_>, list: EntryList) -> Result<bool> {
        if assembly.dedup.is_included(item.id()) {
            return Ok(false);
        }
        let original = usable_snippet(&item.record);
        let mut rungs = vec![self.config.snippet_lines_init];
        if self.config.snippet_lines_min < self.config.snippet_lines_init {
            rungs.push(self.config.snippet_lines_min);
        }

        if let Some(original) = original {
            for target in rungs {
                let Some(trimmed) = self.trimmer.trim(original, target) else {
                    warn!(id = item.id(), "snippet could not be trimmed; omitting it");
                    break;
                };
                if assembly.dedup.has_snippet(&trimmed.id) {
                    debug!(id = item.id(), snippet = %trimmed.id, "duplicate snippet omitted");
                    break;
                }
                let entry = item.entry(Some(trimmed.to_pack()));
                if assembly.try_add(list, entry, item)? {
                    assembly.dedup.mark_snippet(&trimmed.id);
                    assembly.originals.insert(item.id().to_string(), original.clone());
                    return Ok(true);
                }
            }
        }

        let bare = item.entry(None);
        assembly.try_add(list, bare, item)
    }
}

/// A ranked pattern whose body was loaded.
struct Loaded<'r> {
    ranked: &'r RankedPattern,
    record: PatternRecord,
    refs: CrossRefs,
}

impl Loaded<'_> {
    fn id(&self) -> &str {
        &self.ranked.id
    }

    const fn kind(&self) -> PatternType {
        self.record.kind()
    }

    fn entry(&self, snippet: Option<PackSnippet>) -> PackCandidate {
        let record = &self.record;
        let usage = record.stats.usage_count;
        #[allow(clippy::cast_precision_loss)]
        let success_rate = (usage > 0).then(|| round2(record.stats.success_count as f64 / usage as f64));
        PackCandidate {
            id: self.ranked.id.clone(),
            kind: record.kind(),
            title: record.title.clone(),
            score: round2(self.ranked.score),
            summary: truncate_summary(&record.summary, SUMMARY_MAX_CHARS),
            trust: Some(round2(self.ranked.explain.trust.points)),
            usage_count: (usage > 0).then_some(usage),
            success_rate,
            key_insight: record.guidance.key_insight.clone(),
            when_to_use: record.guidance.when_to_use.clone(),
            pitfalls: record.guidance.pitfalls.clone(),
            snippet,
            refs: self.refs.clone(),
        }
    }
}

/// Shortest snippet whose source range is well formed.
fn usable_snippet(record: &PatternRecord) -> Option<&Snippet> {
    let snippet = record.shortest_snippet()?;
    if let Some(source) = &snippet.source {
        if source.start_line == 0 || source.end_line < source.start_line {
            warn!(id = record.id(), source = %source.reference(), "corrupt snippet range; omitting snippet");
            return None;
        }
    }
    Some(snippet)
}

#[derive(Debug, Clone, Copy)]
enum EntryList {
    Candidates,
    AntiPatterns,
    Tests,
}

/// Mutable state shared by every phase.
struct Assembly<'a> {
    pack: PatternPack,
    budget: BudgetManager,
    dedup: Deduper,
    rows: &'a HashMap<String, ExplainRow>,
    /// Untrimmed snippet per included entry, kept for ablation.
    originals: HashMap<String, Snippet>,
}

impl<'a> Assembly<'a> {
    fn start(
        pack: PatternPack,
        config: &PackConfig,
        rows: &'a HashMap<String, ExplainRow>,
        ranked: usize,
    ) -> Result<Self> {
        let mut assembly = Self {
            pack,
            budget: BudgetManager::new(config.budget_bytes, 0),
            dedup: Deduper::new(),
            rows,
            originals: HashMap::new(),
        };
        let baseline = assembly.measure_pessimistic(ranked)?;
        assembly.budget = BudgetManager::new(config.budget_bytes, baseline);
        Ok(assembly)
    }

    /// Skeleton size with `meta` counters at their widest plausible values.
    fn measure_pessimistic(&mut self, included_hint: usize) -> Result<usize> {
        sync_explain(&mut self.pack, self.rows);
        let mut probe = self.pack.clone();
        probe.meta.bytes = probe.meta.budget_bytes.max(probe.meta.bytes);
        probe.meta.included = included_hint.max(probe.entry_count());
        PackSerializer::measure(&probe)
    }

    fn explain_cost(&self, id: &str) -> Result<usize> {
        let Some(explain) = self.pack.meta.explain.as_ref() else {
            return Ok(0);
        };
        match self.rows.get(id) {
            Some(row) => Ok(BudgetManager::append_cost(estimate(row)?, explain.len())),
            None => Ok(0),
        }
    }

    fn add_policy(&mut self, item: &Loaded<'_>) -> Result<()> {
        if !self.dedup.mark_included(item.id()) {
            return Ok(());
        }
        let policy = PackPolicy {
            id: item.ranked.id.clone(),
            summary: truncate_summary(&item.record.summary, SUMMARY_MAX_CHARS),
        };
        let cost = match estimate(&policy) {
            Ok(size) => BudgetManager::append_cost(size, self.pack.policies.len()),
            Err(err) => {
                warn!(id = item.id(), error = %err, "policy could not be serialized; skipping");
                self.dedup.unmark_included(item.id());
                return Ok(());
            }
        };
        let cost = cost + self.explain_cost(item.id())?;
        if !self.budget.would_fit(cost) {
            warn!(id = item.id(), cost, remaining = self.budget.remaining(), "policy exceeds remaining budget");
        }
        self.pack.policies.push(policy);
        self.commit(cost, item.id())
    }

    fn try_add(&mut self, list: EntryList, entry: PackCandidate, item: &Loaded<'_>) -> Result<bool> {
        let len = self.list(list).len();
        let cost = match estimate(&entry) {
            Ok(size) => BudgetManager::append_cost(size, len),
            Err(err) => {
                warn!(id = item.id(), error = %err, "entry could not be serialized; skipping");
                return Ok(false);
            }
        };
        let cost = cost + self.explain_cost(item.id())?;
        if !self.budget.would_fit(cost) {
            return Ok(false);
        }
        self.dedup.mark_included(item.id());
        self.dedup.add_refs(&entry.refs);
        self.list(list).push(entry);
        self.commit(cost, item.id())?;
        Ok(true)
    }

    fn commit(&mut self, cost: usize, id: &str) -> Result<()> {
        self.budget.commit(cost);
        if let Some(explain) = self.pack.meta.explain.as_mut() {
            if let Some(row) = self.rows.get(id) {
                explain.push(row.clone());
            }
        }
        if self.budget.needs_validation() {
            let measured = self.measure_pessimistic(0)?;
            self.budget.reconcile(measured);
        }
        Ok(())
    }

    fn list(&mut self, list: EntryList) -> &mut Vec<PackCandidate> {
        match list {
            EntryList::Candidates => &mut self.pack.candidates,
            EntryList::AntiPatterns => &mut self.pack.anti_patterns,
            EntryList::Tests => &mut self.pack.tests,
        }
    }
}

/// Keep explain rows only for entries still in the pack, in list order.
fn sync_explain(pack: &mut PatternPack, rows: &HashMap<String, ExplainRow>) {
    if pack.meta.explain.is_none() {
        return;
    }
    let synced: Vec<ExplainRow> = pack.ids().filter_map(|id| rows.get(id).cloned()).collect();
    pack.meta.explain = Some(synced);
}
