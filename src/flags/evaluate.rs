//! Flag evaluation.
//!
//! Maps a stored flag record to the boolean decision a caller observes.
//! The baseline `enabled` value acts as a kill switch: when false, the
//! strategy is never consulted.

use super::types::Rollout;
use crate::metrics;
use rand::Rng;

/// Evaluate one flag and count the evaluation.
pub fn evaluate(tenant_id: i32, feature: &str, enabled: bool, rollout: &Rollout) -> bool {
    metrics::record_evaluation(tenant_id, feature, rollout.strategy());
    decide(enabled, rollout)
}

/// The decision itself.
///
/// PERCENTAGE draws a fresh pseudo-random sample per call, so the same
/// caller can observe different decisions across reads. Deterministic
/// per-subject bucketing is a known alternative and deliberately not
/// implemented here.
///
/// USER is a recognized strategy with no targeting data yet; until that
/// lands it behaves exactly like BOOLEAN.
pub fn decide(enabled: bool, rollout: &Rollout) -> bool {
    if !enabled {
        return false;
    }

    match rollout {
        Rollout::Boolean => true,
        Rollout::User => true,
        Rollout::Percentage { percentage } => {
            let sample: f64 = rand::thread_rng().gen_range(0.0..100.0);
            sample < *percentage as f64
        }
    }
}
