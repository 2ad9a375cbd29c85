//! Trust scorer: Wilson lower bound over Beta-Bernoulli pseudo-counts.

use crate::core::PatternMeta;

use super::ScoreComponent;

/// z for a two-sided 95% interval.
const Z_95: f64 = 1.96;

/// Score assumed when a pattern has neither alpha/beta nor a scalar trust.
/// Matches the mean of a uniform Beta(1, 1) prior.
pub const UNINFORMED_TRUST: f64 = 0.5;

/// Lower bound of the 95% Wilson score interval for `alpha` successes out of
/// `alpha + beta` trials. Returns `None` when there is no evidence.
#[must_use]
pub fn wilson_lower_bound(alpha: f64, beta: f64) -> Option<f64> {
    let n = alpha + beta;
    if !n.is_finite() || n <= 0.0 {
        return None;
    }
    let p = alpha / n;
    let z2 = Z_95 * Z_95;
    let centre = p + z2 / (2.0 * n);
    let margin = Z_95 * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();
    let bound = (centre - margin) / (1.0 + z2 / n);
    Some(bound.clamp(0.0, 1.0))
}

/// `points` is the Wilson bound (or fallback), `raw` the point estimate it
/// was derived from.
#[must_use]
pub fn score_trust(meta: &PatternMeta) -> ScoreComponent {
    let trust = &meta.trust;
    if let (Some(alpha), Some(beta)) = (trust.alpha, trust.beta) {
        if let Some(bound) = wilson_lower_bound(alpha, beta) {
            return ScoreComponent::new(bound, alpha / (alpha + beta));
        }
    }
    if let Some(score) = trust.score {
        let score = score.clamp(0.0, 1.0);
        return ScoreComponent::new(score, score);
    }
    ScoreComponent::new(UNINFORMED_TRUST, UNINFORMED_TRUST)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PatternType, TrustParams};

    fn meta(trust: TrustParams) -> PatternMeta {
        let mut meta = PatternMeta::new("p", PatternType::Pattern);
        meta.trust = trust;
        meta
    }

    #[test]
    fn more_evidence_raises_the_bound() {
        let ten = wilson_lower_bound(10.0, 0.0).unwrap();
        let two = wilson_lower_bound(2.0, 0.0).unwrap();
        assert!(ten > two, "{ten} should exceed {two}");
        assert!((ten - 0.7225).abs() < 1e-3);
        assert!((two - 0.3424).abs() < 1e-3);
    }

    #[test]
    fn bound_is_below_point_estimate() {
        let bound = wilson_lower_bound(30.0, 10.0).unwrap();
        assert!(bound < 0.75);
        assert!(bound > 0.55);
    }

    #[test]
    fn no_evidence_has_no_bound() {
        assert!(wilson_lower_bound(0.0, 0.0).is_none());
    }

    #[test]
    fn falls_back_to_scalar_then_prior() {
        let scalar = score_trust(&meta(TrustParams::scalar(0.8)));
        assert!((scalar.points - 0.8).abs() < f64::EPSILON);

        let empty = score_trust(&meta(TrustParams::default()));
        assert!((empty.points - UNINFORMED_TRUST).abs() < f64::EPSILON);

        let zero = score_trust(&meta(TrustParams {
            score: Some(0.9),
            alpha: Some(0.0),
            beta: Some(0.0),
        }));
        assert!((zero.points - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn raw_is_success_rate() {
        let c = score_trust(&meta(TrustParams::bayesian(3.0, 1.0)));
        assert!((c.raw - 0.75).abs() < f64::EPSILON);
    }
}
