//! Per-pattern bloom filter over glob prefixes.
//!
//! Used to discard query paths that cannot match any of a pattern's globs
//! before running the full glob matcher. False positives only cost a glob
//! match; false negatives cannot happen.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::core::paths;

const BITS_PER_ITEM: usize = 10;
const HASHES: u32 = 4;

#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: usize,
}

impl BloomFilter {
    /// Sized for `expected` items at roughly 1% false positives.
    #[must_use]
    pub fn with_capacity(expected: usize) -> Self {
        let num_bits = (expected.max(1) * BITS_PER_ITEM).next_power_of_two().max(64);
        Self {
            bits: vec![0; num_bits / 64],
            num_bits,
        }
    }

    fn hashes(item: &str) -> (u64, u64) {
        let mut h1 = DefaultHasher::new();
        item.hash(&mut h1);
        let mut h2 = DefaultHasher::new();
        0x9e37_79b9_7f4a_7c15_u64.hash(&mut h2);
        item.hash(&mut h2);
        (h1.finish(), h2.finish() | 1)
    }

    fn bit_indexes(&self, item: &str) -> impl Iterator<Item = usize> {
        let (h1, h2) = Self::hashes(item);
        let mask = (self.num_bits - 1) as u64;
        (0..u64::from(HASHES)).map(move |i| {
            #[allow(clippy::cast_possible_truncation)]
            let idx = (h1.wrapping_add(i.wrapping_mul(h2)) & mask) as usize;
            idx
        })
    }

    pub fn insert(&mut self, item: &str) {
        let indexes: Vec<usize> = self.bit_indexes(item).collect();
        for idx in indexes {
            self.bits[idx / 64] |= 1 << (idx % 64);
        }
    }

    #[must_use]
    pub fn contains(&self, item: &str) -> bool {
        self.bit_indexes(item)
            .all(|idx| self.bits[idx / 64] & (1 << (idx % 64)) != 0)
    }
}

/// Bloom filter over every cumulative literal prefix of a pattern's globs
/// (`src`, `src/api`, ...).
#[derive(Debug, Clone)]
pub struct PathBloom {
    filter: BloomFilter,
    /// Some glob starts with a wildcard, so any path may match.
    unanchored: bool,
}

impl PathBloom {
    #[must_use]
    pub fn build(globs: &[String]) -> Self {
        let prefixes: Vec<String> = globs
            .iter()
            .flat_map(|glob| {
                let segs = paths::literal_prefix(glob);
                (1..=segs.len()).map(move |n| segs[..n].join("/"))
            })
            .collect();
        let mut filter = BloomFilter::with_capacity(prefixes.len());
        for prefix in &prefixes {
            filter.insert(prefix);
        }
        Self {
            filter,
            unanchored: globs.iter().any(|g| paths::literal_prefix(g).is_empty()),
        }
    }

    /// False means no glob of this pattern can match `path`.
    #[must_use]
    pub fn may_match(&self, path: &str) -> bool {
        if self.unanchored {
            return true;
        }
        let mut prefix = String::with_capacity(path.len());
        for segment in paths::segments(path) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            if self.filter.contains(&prefix) {
                return true;
            }
        }
        false
    }
}
