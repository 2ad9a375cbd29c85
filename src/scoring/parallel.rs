//! Scatter-gather scoring of candidate sets.
//!
//! Scoring a candidate reads only the immutable corpus and the scoring
//! context, so candidates can be split across rayon workers freely. Shards are
//! concatenated in input order; ordering by score happens later in the
//! ranker's bounded heap.

use rayon::prelude::*;
use tracing::trace;

use crate::core::Corpus;

use super::{ScoredCandidate, ScoringContext};

/// Below this many candidates the sequential path is used.
pub const DEFAULT_SHARD_THRESHOLD: usize = 256;

/// Candidates per shard on the parallel path.
pub const DEFAULT_SHARD_SIZE: usize = 64;

/// Scores a batch of corpus positions. Unknown positions are skipped.
pub trait CandidateScorer: Send + Sync {
    fn score(
        &self,
        ctx: &ScoringContext,
        corpus: &Corpus,
        positions: &[usize],
    ) -> Vec<ScoredCandidate>;
}

/// Scores on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialScorer;

impl CandidateScorer for SequentialScorer {
    fn score(
        &self,
        ctx: &ScoringContext,
        corpus: &Corpus,
        positions: &[usize],
    ) -> Vec<ScoredCandidate> {
        positions
            .iter()
            .filter_map(|&pos| corpus.get(pos).map(|entry| ctx.score(pos, entry)))
            .collect()
    }
}

/// Partitions candidates into fixed-size shards scored on the rayon pool.
#[derive(Debug, Clone, Copy)]
pub struct ShardedScorer {
    shard_size: usize,
}

impl Default for ShardedScorer {
    fn default() -> Self {
        Self::new(DEFAULT_SHARD_SIZE)
    }
}

impl ShardedScorer {
    #[must_use]
    pub fn new(shard_size: usize) -> Self {
        Self {
            shard_size: shard_size.max(1),
        }
    }
}

impl CandidateScorer for ShardedScorer {
    fn score(
        &self,
        ctx: &ScoringContext,
        corpus: &Corpus,
        positions: &[usize],
    ) -> Vec<ScoredCandidate> {
        let shards: Vec<Vec<ScoredCandidate>> = positions
            .par_chunks(self.shard_size)
            .map(|shard| SequentialScorer.score(ctx, corpus, shard))
            .collect();
        trace!(shards = shards.len(), "gathered scoring shards");
        shards.into_iter().flatten().collect()
    }
}

/// Picks the sequential or sharded path by candidate count.
#[derive(Debug, Clone, Copy)]
pub struct ParallelScorer {
    threshold: usize,
    sharded: ShardedScorer,
}

impl Default for ParallelScorer {
    fn default() -> Self {
        Self::new(DEFAULT_SHARD_THRESHOLD)
    }
}

impl ParallelScorer {
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            sharded: ShardedScorer::default(),
        }
    }

    #[must_use]
    pub const fn with_shard_size(mut self, shard_size: usize) -> Self {
        self.sharded = ShardedScorer {
            shard_size: if shard_size == 0 { 1 } else { shard_size },
        };
        self
    }

    #[must_use]
    pub const fn uses_shards(&self, candidates: usize) -> bool {
        candidates >= self.threshold
    }
}

impl CandidateScorer for ParallelScorer {
    fn score(
        &self,
        ctx: &ScoringContext,
        corpus: &Corpus,
        positions: &[usize],
    ) -> Vec<ScoredCandidate> {
        if self.uses_shards(positions.len()) {
            self.sharded.score(ctx, corpus, positions)
        } else {
            SequentialScorer.score(ctx, corpus, positions)
        }
    }
}
