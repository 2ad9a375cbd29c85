//! In-memory pattern store, loadable from a JSON snapshot.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::core::{PatternMeta, PatternRecord};
use crate::error::{PatpackError, Result};

use super::PatternRepository;

/// Pattern records keyed by id, insertion order preserved for enumeration.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Vec<PatternRecord>,
    by_id: HashMap<String, usize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate, normalize and insert a record. Replaces an existing id.
    pub fn insert(&mut self, mut record: PatternRecord) -> Result<()> {
        record.validate()?;
        record.meta.normalize();
        let id = record.meta.id.clone();
        if let Some(&pos) = self.by_id.get(&id) {
            self.records[pos] = record;
        } else {
            self.by_id.insert(id, self.records.len());
            self.records.push(record);
        }
        Ok(())
    }

    pub fn from_records(records: impl IntoIterator<Item = PatternRecord>) -> Result<Self> {
        let mut store = Self::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Parse a JSON array of pattern records.
    ///
    /// Duplicate ids in one snapshot are rejected rather than silently
    /// overwritten.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let records: Vec<PatternRecord> = serde_json::from_str(raw)?;
        let mut store = Self::new();
        for record in records {
            if store.by_id.contains_key(&record.meta.id) {
                return Err(PatpackError::InvalidPattern(format!(
                    "duplicate pattern id {}",
                    record.meta.id
                )));
            }
            store.insert(record)?;
        }
        debug!(count = store.len(), "loaded pattern snapshot");
        Ok(store)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw).map_err(|err| match err {
            PatpackError::Serialization(inner) => PatpackError::InvalidPattern(format!(
                "parse snapshot {}: {inner}",
                path.display()
            )),
            other => other,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PatternRecord> {
        self.by_id.get(id).map(|&pos| &self.records[pos])
    }

    /// Drop a record. Used to simulate bodies vanishing between rank and load.
    pub fn remove(&mut self, id: &str) -> Option<PatternRecord> {
        let pos = self.by_id.remove(id)?;
        let record = self.records.remove(pos);
        for slot in self.by_id.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(record)
    }
}

impl PatternRepository for MemoryStore {
    fn all_meta(&self) -> Result<Vec<PatternMeta>> {
        Ok(self.records.iter().map(|r| r.meta.clone()).collect())
    }

    fn load(&self, id: &str) -> Result<Option<PatternRecord>> {
        Ok(self.get(id).cloned())
    }
}
