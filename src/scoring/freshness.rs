//! Freshness scorer: exponential decay since the last review.

use chrono::{DateTime, Utc};

use crate::core::PatternMeta;

use super::ScoreComponent;

/// Points for a pattern that has never been reviewed.
pub const UNREVIEWED_FRESHNESS: f64 = 0.5;

/// `points = 2^(-days / half_life)`. `raw` is the age in days, or `-1.0`
/// when the pattern carries no review timestamp.
#[must_use]
pub fn score_freshness(
    meta: &PatternMeta,
    now: DateTime<Utc>,
    default_half_life_days: f64,
) -> ScoreComponent {
    let Some(reviewed) = meta.metadata.last_reviewed else {
        return ScoreComponent::new(UNREVIEWED_FRESHNESS, -1.0);
    };
    let half_life = meta
        .metadata
        .half_life_days
        .filter(|h| h.is_finite() && *h > 0.0)
        .unwrap_or(default_half_life_days)
        .max(f64::MIN_POSITIVE);

    #[allow(clippy::cast_precision_loss)]
    let days = ((now - reviewed).num_seconds().max(0) as f64) / 86_400.0;
    ScoreComponent::new((-days / half_life).exp2(), days)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::core::PatternType;

    fn reviewed(days_ago: i64, half_life: Option<f64>) -> (PatternMeta, DateTime<Utc>) {
        let now = Utc::now();
        let mut meta = PatternMeta::new("p", PatternType::Pattern);
        meta.metadata.last_reviewed = Some(now - Duration::days(days_ago));
        meta.metadata.half_life_days = half_life;
        (meta, now)
    }

    #[test]
    fn one_half_life_halves_points() {
        let (meta, now) = reviewed(30, Some(30.0));
        let c = score_freshness(&meta, now, 180.0);
        assert!((c.points - 0.5).abs() < 1e-9);
        assert!((c.raw - 30.0).abs() < 1e-9);
    }

    #[test]
    fn default_half_life_applies() {
        let (meta, now) = reviewed(360, None);
        let c = score_freshness(&meta, now, 180.0);
        assert!((c.points - 0.25).abs() < 1e-9);
    }

    #[test]
    fn future_review_is_fully_fresh() {
        let (meta, now) = reviewed(-5, Some(10.0));
        let c = score_freshness(&meta, now, 180.0);
        assert!((c.points - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unreviewed_is_neutral() {
        let meta = PatternMeta::new("p", PatternType::Pattern);
        let c = score_freshness(&meta, Utc::now(), 180.0);
        assert!((c.points - UNREVIEWED_FRESHNESS).abs() < f64::EPSILON);
        assert!(c.raw < 0.0);
    }
}
