//! Weight vector for combining sub-scores.

use serde::{Deserialize, Serialize};

use crate::error::{PatpackError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default)]
    pub scope: f64,
    #[serde(default)]
    pub trust: f64,
    #[serde(default)]
    pub freshness: f64,
    #[serde(default)]
    pub locality: f64,
    #[serde(default)]
    pub policy: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            scope: 0.35,
            trust: 0.25,
            freshness: 0.15,
            locality: 0.15,
            policy: 0.10,
        }
    }
}

impl ScoringWeights {
    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("scope", self.scope),
            ("trust", self.trust),
            ("freshness", self.freshness),
            ("locality", self.locality),
            ("policy", self.policy),
        ]
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.named().iter().map(|(_, w)| w).sum()
    }

    /// Reject negative or non-finite entries and an all-zero vector, then
    /// rescale so the weights sum to 1.
    pub fn normalized(&self) -> Result<Self> {
        for (name, weight) in self.named() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PatpackError::Config(format!(
                    "weight {name} must be a finite non-negative number, got {weight}"
                )));
            }
        }
        let total = self.sum();
        if total <= 0.0 {
            return Err(PatpackError::Config(
                "scoring weights must have a positive sum".to_string(),
            ));
        }
        let normalized = Self {
            scope: self.scope / total,
            trust: self.trust / total,
            freshness: self.freshness / total,
            locality: self.locality / total,
            policy: self.policy / total,
        };
        if (normalized.sum() - 1.0).abs() > 1e-9 {
            return Err(PatpackError::Config(format!(
                "scoring weights do not sum to 1 after normalization ({})",
                normalized.sum()
            )));
        }
        Ok(normalized)
    }

    /// Stable bit pattern for cache keys.
    #[must_use]
    pub fn fingerprint(&self) -> [u64; 5] {
        [
            self.scope.to_bits(),
            self.trust.to_bits(),
            self.freshness.to_bits(),
            self.locality.to_bits(),
            self.policy.to_bits(),
        ]
    }
}
