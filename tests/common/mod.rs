//! Helpers shared by the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use patpack::config::Config;
use patpack::core::PatternRecord;
use patpack::ranking::PatternRanker;
use patpack::storage::MemoryStore;

/// Fixed clock so freshness and failure windows are reproducible.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn store(records: Vec<PatternRecord>) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::from_records(records).expect("valid records"))
}

pub fn ranker(store: &MemoryStore, config: &Config) -> PatternRanker {
    PatternRanker::from_repository(store, config)
        .expect("ranker builds")
        .with_now(fixed_now())
}
