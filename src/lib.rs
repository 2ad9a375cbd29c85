//! patpack: rank reusable coding patterns against a task's context and
//! assemble the best of them into a byte-budgeted pack.
//!
//! The flow is one-way: [`Signals`] go to the [`PatternRanker`], which
//! narrows the corpus with [`search::CandidateGenerator`], scores candidates
//! and keeps a bounded top-K. The ranked list then goes to the
//! [`PackBuilder`], which loads full bodies from a [`PatternRepository`] and
//! emits a [`PatternPack`] whose canonical JSON fits the budget.

pub mod config;
pub mod core;
pub mod error;
pub mod pack;
pub mod ranking;
pub mod scoring;
pub mod search;
pub mod storage;
pub mod telemetry;
pub mod test_utils;

pub use config::{Config, PackOverrides, RankOverrides};
pub use crate::core::{PatternMeta, PatternRecord, PatternType, Signals};
pub use error::{PatpackError, Result};
pub use pack::{PackBuild, PackBuilder, PatternPack};
pub use ranking::{PatternRanker, RankedPattern};
pub use storage::{MemoryStore, PatternRepository};
