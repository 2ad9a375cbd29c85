//! Read-only boundary to the pattern store.
//!
//! Persistence lives elsewhere. The ranking core only needs an enumerable
//! snapshot of `PatternMeta` and a by-id lookup for full bodies.

use crate::core::{PatternMeta, PatternRecord};
use crate::error::Result;

pub mod memory;

pub use memory::MemoryStore;

/// Lookup interface the ranker and pack builder consume.
pub trait PatternRepository: Send + Sync {
    /// Snapshot of every pattern's indexable metadata.
    fn all_meta(&self) -> Result<Vec<PatternMeta>>;

    /// Full body by id. `Ok(None)` when the id is unknown.
    fn load(&self, id: &str) -> Result<Option<PatternRecord>>;
}
