//! Candidate search over the pattern corpus
//!
//! Inverted facet indices, a path trie and per-pattern bloom filters narrow
//! the corpus before scoring. The query cache memoizes finished rankings.

pub mod bloom;
pub mod cache;
pub mod candidates;
pub mod index;
pub mod trie;

pub use bloom::{BloomFilter, PathBloom};
pub use cache::{CacheStats, QueryCache};
pub use candidates::{CandidateGenerator, CandidateQuery, CandidateSet, GenerationStats};
pub use index::FacetIndex;
pub use trie::PathTrie;
