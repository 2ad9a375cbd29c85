//! Byte-budgeted pack assembly.
//!
//! [`PackBuilder`] turns a ranked list into a [`PatternPack`] whose canonical
//! serialization fits `budget_bytes`, shrinking it through [`ablation`] when
//! greedy assembly overshoots.

pub mod ablation;
pub mod budget;
pub mod builder;
pub mod dedup;
pub mod serializer;
pub mod snippet;
pub mod types;

pub use ablation::{AblationReport, AblationStage, AblationStep, Ablator};
pub use budget::BudgetManager;
pub use builder::{PackBuild, PackBuilder};
pub use dedup::{Deduper, RefKind, parse_cross_refs};
pub use serializer::PackSerializer;
pub use snippet::{SnippetTrimmer, TrimmedSnippet, content_hash};
pub use types::{
    CrossRefs, ExplainRow, PackCandidate, PackMeta, PackPolicy, PackSnippet, PatternPack,
};
