//! Core pattern, signal and corpus types

pub mod corpus;
pub mod paths;
pub mod pattern;
pub mod signals;

pub use corpus::{Corpus, CorpusEntry};
pub use paths::{PathGlob, normalize_path};
pub use pattern::{
    FrameworkReq, Guidance, PatternMeta, PatternMetadata, PatternRecord, PatternScope,
    PatternType, Snippet, SourceRef, TrustParams, UsageStats, parse_lenient_version,
};
pub use signals::{FrameworkSignal, Signals};
