//! Evaluation counters.
//!
//! In-process stand-in for the external metrics exporter. Counts every flag
//! evaluation labeled by tenant, feature name, and strategy.

use dashmap::DashMap;
use once_cell::sync::Lazy;

/// Label set for one evaluation counter
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EvaluationKey {
    pub tenant_id: i32,
    pub feature: String,
    pub strategy: &'static str,
}

static EVALUATION_COUNTS: Lazy<DashMap<EvaluationKey, u64>> = Lazy::new(DashMap::new);

/// Count one evaluation for the given labels.
pub fn record_evaluation(tenant_id: i32, feature: &str, strategy: &'static str) {
    let key = EvaluationKey {
        tenant_id,
        feature: feature.to_string(),
        strategy,
    };
    *EVALUATION_COUNTS.entry(key).or_insert(0) += 1;
}

/// Current count for the given labels. Zero if never evaluated.
pub fn evaluation_count(tenant_id: i32, feature: &str, strategy: &'static str) -> u64 {
    let key = EvaluationKey {
        tenant_id,
        feature: feature.to_string(),
        strategy,
    };
    EVALUATION_COUNTS.get(&key).map(|c| *c).unwrap_or(0)
}

/// Snapshot of all counters, for export or inspection.
pub fn snapshot() -> Vec<(EvaluationKey, u64)> {
    EVALUATION_COUNTS
        .iter()
        .map(|entry| (entry.key().clone(), *entry.value()))
        .collect()
}
