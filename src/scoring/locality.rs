//! Locality scorer: how close the task's files sit to where a pattern lives.
//!
//! Unlike the scope scorer this does not care whether a glob matches. It
//! compares the directory part of each query path with the literal prefix of
//! each declared glob and rewards shared leading components, then adds credit
//! for a shared repository or organization.

use crate::core::{PatternMeta, Signals, paths};

use super::ScoreComponent;

const DIRECTORY_WEIGHT: f64 = 0.7;
const REPO_WEIGHT: f64 = 0.2;
const ORG_WEIGHT: f64 = 0.1;

/// `raw` is the longest shared directory prefix, in components.
#[must_use]
pub fn score_locality(meta: &PatternMeta, signals: &Signals) -> ScoreComponent {
    let mut best_ratio = 0.0_f64;
    let mut best_shared = 0usize;

    for glob in &meta.scope.paths {
        let prefix = paths::literal_prefix(glob);
        if prefix.is_empty() {
            continue;
        }
        for path in &signals.paths {
            let dirs: Vec<&str> = {
                let mut segs: Vec<&str> = paths::segments(path).collect();
                segs.pop();
                segs
            };
            let shared = paths::shared_prefix_len(prefix.iter().copied(), dirs.iter().copied());
            if shared == 0 {
                continue;
            }
            let longest = prefix.len().max(dirs.len()).max(1);
            #[allow(clippy::cast_precision_loss)]
            let ratio = shared as f64 / longest as f64;
            if ratio > best_ratio {
                best_ratio = ratio;
            }
            best_shared = best_shared.max(shared);
        }
    }

    let same_repo = same_owner(meta.metadata.repo.as_deref(), signals.repo.as_deref());
    let same_org = same_owner(meta.metadata.org.as_deref(), signals.org.as_deref());

    let points = DIRECTORY_WEIGHT.mul_add(
        best_ratio,
        REPO_WEIGHT * f64::from(u8::from(same_repo)) + ORG_WEIGHT * f64::from(u8::from(same_org)),
    );
    #[allow(clippy::cast_precision_loss)]
    ScoreComponent::new(points.clamp(0.0, 1.0), best_shared as f64)
}

fn same_owner(pattern: Option<&str>, query: Option<&str>) -> bool {
    matches!((pattern, query), (Some(a), Some(b)) if !a.is_empty() && a.eq_ignore_ascii_case(b))
}
