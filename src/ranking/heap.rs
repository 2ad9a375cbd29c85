//! Bounded top-K selection.
//!
//! A min-heap of at most K entries: the root is the weakest kept candidate,
//! so each insert is one comparison plus O(log K) when it displaces the root.
//! The full candidate set is never sorted.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::scoring::ScoredCandidate;

/// Scores closer than this are considered tied.
pub const TIE_EPSILON: f64 = 0.001;

/// Exact total order: score, then scope points, then trust points, then the
/// smaller id ranks higher. `Greater` means "ranks higher".
fn strength(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.breakdown.scope.points.total_cmp(&b.breakdown.scope.points))
        .then_with(|| a.breakdown.trust.points.total_cmp(&b.breakdown.trust.points))
        .then_with(|| b.id.cmp(&a.id))
}

/// Display order for two ranked entries. Near-equal scores fall through to
/// scope points desc, trust points desc, id asc. `Less` means `a` comes
/// first.
#[must_use]
pub fn display_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    if (a.score - b.score).abs() >= TIE_EPSILON {
        return b.score.total_cmp(&a.score);
    }
    b.breakdown
        .scope
        .points
        .total_cmp(&a.breakdown.scope.points)
        .then_with(|| b.breakdown.trust.points.total_cmp(&a.breakdown.trust.points))
        .then_with(|| a.id.cmp(&b.id))
}

struct Entry(ScoredCandidate);

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        strength(&self.0, &other.0)
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct TopK {
    capacity: usize,
    heap: BinaryHeap<Reverse<Entry>>,
    evictions: u64,
}

impl TopK {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1)),
            evictions: 0,
        }
    }

    pub fn push(&mut self, candidate: ScoredCandidate) {
        if self.capacity == 0 {
            self.evictions += 1;
            return;
        }
        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(Entry(candidate)));
            return;
        }
        let displaces_root = self
            .heap
            .peek()
            .is_some_and(|Reverse(weakest)| strength(&candidate, &weakest.0) == Ordering::Greater);
        if displaces_root {
            self.heap.pop();
            self.heap.push(Reverse(Entry(candidate)));
        }
        self.evictions += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Candidates pushed that did not survive.
    #[must_use]
    pub const fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Drain into display order: descending score with the near-tie chain
    /// applied between neighbours.
    #[must_use]
    pub fn into_sorted(self) -> Vec<ScoredCandidate> {
        let mut items: Vec<ScoredCandidate> = self
            .heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(Entry(c))| c)
            .collect();
        // The epsilon comparator is not transitive, so a library sort may
        // panic on it. Insertion sort over an already score-ordered K is
        // cheap and always terminates.
        for i in 1..items.len() {
            let mut j = i;
            while j > 0 && display_order(&items[j - 1], &items[j]) == Ordering::Greater {
                items.swap(j - 1, j);
                j -= 1;
            }
        }
        items
    }
}
