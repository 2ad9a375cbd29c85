//! Canonical serialization and size measurement.
//!
//! The canonical form is compact JSON with object keys sorted recursively,
//! so the same pack always measures the same number of bytes no matter how
//! its fields were declared or filled in.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

use super::types::PatternPack;

/// zstd level for the compressed-size metric.
const COMPRESSION_LEVEL: i32 = 3;

/// Passes allowed for `meta.bytes` to settle on its own digit count.
const MAX_SIZE_PASSES: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct PackSerializer;

impl PackSerializer {
    /// Any serializable value as a key-sorted JSON tree.
    pub fn canonical_value<T: Serialize>(value: &T) -> Result<Value> {
        Ok(sort_keys(serde_json::to_value(value)?))
    }

    pub fn to_canonical_string<T: Serialize>(value: &T) -> Result<String> {
        let tree = Self::canonical_value(value)?;
        Ok(serde_json::to_string(&tree)?)
    }

    /// Byte length of the canonical form.
    pub fn measure<T: Serialize>(value: &T) -> Result<usize> {
        Ok(Self::to_canonical_string(value)?.len())
    }

    /// zstd-compressed length of the canonical form. Reported for
    /// observability only.
    pub fn compressed_size<T: Serialize>(value: &T) -> Result<usize> {
        let raw = Self::to_canonical_string(value)?;
        let compressed = zstd::encode_all(raw.as_bytes(), COMPRESSION_LEVEL)?;
        Ok(compressed.len())
    }

    /// Store the pack's own canonical size in `meta.bytes` and return the
    /// canonical text. Writing the size can change its digit count, so this
    /// repeats until the value is stable.
    pub fn finalize(pack: &mut PatternPack) -> Result<String> {
        pack.refresh_counts();
        let mut text = Self::to_canonical_string(pack)?;
        for _ in 0..MAX_SIZE_PASSES {
            if pack.meta.bytes == text.len() {
                break;
            }
            pack.meta.bytes = text.len();
            text = Self::to_canonical_string(pack)?;
        }
        Ok(text)
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, sort_keys(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
