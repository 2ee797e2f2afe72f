//! Audit recorder.
//!
//! Appends one immutable entry per flag change or promotion. Appends are
//! best-effort: a failed audit write is logged and swallowed so the primary
//! mutation is never blocked or rolled back by audit-trail unavailability.

use crate::orm::audit_log;
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, Set};
use serde_json::json;

/// Entity kind for single-flag changes
pub const ENTITY_FLAG: &str = "flag";
/// Entity kind for bulk environment promotions
pub const ENTITY_ENVIRONMENT: &str = "environment";

/// Change type recorded with each entry
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Promote,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Promote => "PROMOTE",
        }
    }
}

/// Diff payload for a create, update, or delete.
/// `before` is null on CREATE, `after` is null on DELETE.
pub fn change_diff(
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
) -> serde_json::Value {
    json!({ "before": before, "after": after })
}

/// Diff payload summarizing one environment promotion.
pub fn promotion_diff(source_env: &str, target_env: &str, promoted_count: u64) -> serde_json::Value {
    json!({
        "source_env": source_env,
        "target_env": target_env,
        "promoted_count": promoted_count,
    })
}

/// Appends audit entries to the durable log.
#[derive(Clone)]
pub struct AuditRecorder {
    db: DatabaseConnection,
}

impl AuditRecorder {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Append one entry. Failures are logged, never propagated.
    pub async fn record(
        &self,
        tenant_id: i32,
        actor: &str,
        action: AuditAction,
        entity_kind: &str,
        entity_id: String,
        diff: Option<serde_json::Value>,
    ) {
        let entry = audit_log::ActiveModel {
            tenant_id: Set(tenant_id),
            actor: Set(actor.to_string()),
            action: Set(action.as_str().to_string()),
            entity_kind: Set(entity_kind.to_string()),
            entity_id: Set(entity_id),
            diff: Set(diff),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        };

        if let Err(e) = entry.insert(&self.db).await {
            log::warn!(
                "Audit append failed (tenant {}, action {}): {}",
                tenant_id,
                action.as_str(),
                e
            );
        }
    }

    /// Newest-first page of a tenant's audit trail.
    pub async fn list_for_tenant(
        &self,
        tenant_id: i32,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<audit_log::Model>, u64), DbErr> {
        let total = audit_log::Entity::find()
            .filter(audit_log::Column::TenantId.eq(tenant_id))
            .count(&self.db)
            .await? as u64;

        let entries = audit_log::Entity::find()
            .filter(audit_log::Column::TenantId.eq(tenant_id))
            .order_by_desc(audit_log::Column::CreatedAt)
            .order_by_desc(audit_log::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok((entries, total))
    }
}
