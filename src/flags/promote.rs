//! Environment promotion.
//!
//! Copies a tenant's entire flag set from one environment to another. The
//! copy is a single store transaction; a failure on any record leaves the
//! target environment exactly as it was.

use super::cache::FlagCache;
use super::store::FlagStore;
use super::types::Environment;
use crate::audit::{self, AuditAction, AuditRecorder};
use crate::error::ServiceError;

/// Promote every flag in `source` to `target` for one tenant. Returns the
/// number of records promoted.
pub async fn promote_environment(
    store: &FlagStore,
    cache: &FlagCache,
    recorder: &AuditRecorder,
    tenant_id: i32,
    actor: &str,
    source: Environment,
    target: Environment,
) -> Result<u64, ServiceError> {
    // Environment membership is already guaranteed by the parsed type; the
    // only pair-level rule left is that source and target differ. Checked
    // before any store access.
    if source == target {
        return Err(ServiceError::Validation(
            "Source and target environments must differ.".to_string(),
        ));
    }

    let records = store.list_all(tenant_id, source).await?;
    if records.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "No flags to promote in environment '{}'.",
            source
        )));
    }

    let promoted = store.promote_records(tenant_id, target, &records).await?;

    // Post-commit actions are best-effort and never unwind the committed
    // promotion. The source environment was only read, so only the target's
    // cache entry is dropped.
    cache.invalidate(tenant_id, target).await;
    recorder
        .record(
            tenant_id,
            actor,
            AuditAction::Promote,
            audit::ENTITY_ENVIRONMENT,
            target.as_str().to_string(),
            Some(audit::promotion_diff(
                source.as_str(),
                target.as_str(),
                promoted,
            )),
        )
        .await;

    Ok(promoted)
}
