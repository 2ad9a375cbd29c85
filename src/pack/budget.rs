//! Incremental byte accounting against a pack budget.
//!
//! Costs are computed per proposed addition from the compact JSON grammar,
//! so checking whether an item fits never re-serializes the whole pack. The
//! running total can drift (counters in `meta` change width as items are
//! added), which is why the manager periodically asks to be reconciled
//! against a real measurement.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Reconcile after this many commits.
pub const DEFAULT_VALIDATE_EVERY: usize = 8;

/// Reconcile on every commit once less than this fraction remains.
const LOW_WATER_FRACTION: f64 = 0.10;

/// Serialized size of a JSON string: escaped content plus two quotes.
#[must_use]
pub fn string_size(s: &str) -> usize {
    let escaped: usize = s
        .chars()
        .map(|c| match c {
            '"' | '\\' | '\n' | '\r' | '\t' | '\u{08}' | '\u{0c}' => 2,
            c if (c as u32) < 0x20 => 6,
            c => c.len_utf8(),
        })
        .sum();
    escaped + 2
}

/// `"key":value`.
#[must_use]
pub fn field_size(key: &str, value_size: usize) -> usize {
    string_size(key) + 1 + value_size
}

/// Brackets plus separators around members of the given sizes.
#[must_use]
pub fn structure_size(member_sizes: impl IntoIterator<Item = usize>) -> usize {
    let (count, total) = member_sizes
        .into_iter()
        .fold((0usize, 0usize), |(n, sum), size| (n + 1, sum + size));
    2 + total + count.saturating_sub(1)
}

/// Compact serialized size of a JSON tree.
#[must_use]
pub fn value_size(value: &Value) -> usize {
    match value {
        Value::Null => 4,
        Value::Bool(true) => 4,
        Value::Bool(false) => 5,
        Value::Number(n) => n.to_string().len(),
        Value::String(s) => string_size(s),
        Value::Array(items) => structure_size(items.iter().map(value_size)),
        Value::Object(map) => structure_size(map.iter().map(|(k, v)| field_size(k, value_size(v)))),
    }
}

/// Estimated size of any serializable item.
pub fn estimate<T: Serialize>(item: &T) -> Result<usize> {
    Ok(value_size(&serde_json::to_value(item)?))
}

#[derive(Debug, Clone)]
pub struct BudgetManager {
    budget: usize,
    used: usize,
    ops: usize,
    last_reconciled: usize,
    validate_every: usize,
}

impl BudgetManager {
    /// `baseline` is the measured size of the empty pack skeleton.
    #[must_use]
    pub fn new(budget: usize, baseline: usize) -> Self {
        Self {
            budget,
            used: baseline,
            ops: 0,
            last_reconciled: 0,
            validate_every: DEFAULT_VALIDATE_EVERY,
        }
    }

    #[must_use]
    pub fn with_validate_every(mut self, every: usize) -> Self {
        self.validate_every = every.max(1);
        self
    }

    #[must_use]
    pub const fn budget(&self) -> usize {
        self.budget
    }

    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.used)
    }

    /// Cost of appending an item of `item_size` to a list that already
    /// holds `list_len` items.
    #[must_use]
    pub const fn append_cost(item_size: usize, list_len: usize) -> usize {
        if list_len == 0 { item_size } else { item_size + 1 }
    }

    #[must_use]
    pub const fn would_fit(&self, cost: usize) -> bool {
        self.used + cost <= self.budget
    }

    /// Record an addition. Mandatory items may push the total over budget.
    pub const fn commit(&mut self, cost: usize) {
        self.used += cost;
        self.ops += 1;
    }

    /// True every `validate_every` commits, or after any commit once the
    /// remaining budget is under 10%.
    #[must_use]
    pub fn needs_validation(&self) -> bool {
        if self.ops == self.last_reconciled {
            return false;
        }
        #[allow(clippy::cast_precision_loss)]
        let low_water = (self.budget as f64 * LOW_WATER_FRACTION) as usize;
        self.ops - self.last_reconciled >= self.validate_every || self.remaining() < low_water
    }

    /// Replace the running estimate with a measured size.
    pub fn reconcile(&mut self, measured: usize) {
        if measured != self.used {
            tracing::trace!(estimated = self.used, measured, "budget estimate corrected");
        }
        self.used = measured;
        self.last_reconciled = self.ops;
    }
}
