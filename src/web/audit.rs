//! Audit trail endpoint.

use crate::error::ServiceError;
use crate::flags::{FlagService, Pagination};
use crate::orm::audit_log;
use actix_web::{get, web, HttpResponse};
use serde::{Deserialize, Serialize};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_audit);
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AuditEntryResponse {
    pub id: i32,
    pub actor: String,
    pub action: String,
    pub entity_kind: String,
    pub entity_id: String,
    pub diff: Option<serde_json::Value>,
    pub created_at: chrono::NaiveDateTime,
}

impl From<audit_log::Model> for AuditEntryResponse {
    fn from(entry: audit_log::Model) -> Self {
        Self {
            id: entry.id,
            actor: entry.actor,
            action: entry.action,
            entity_kind: entry.entity_kind,
            entity_id: entry.entity_id,
            diff: entry.diff,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditPage {
    pub items: Vec<AuditEntryResponse>,
    pub pagination: Pagination,
}

#[get("/tenants/{tenant_id}/audit")]
async fn list_audit(
    service: web::Data<FlagService>,
    path: web::Path<i32>,
    query: web::Query<AuditQuery>,
) -> Result<HttpResponse, ServiceError> {
    let tenant_id = path.into_inner();
    let query = query.into_inner();

    let (entries, pagination) = service
        .audit_trail(tenant_id, query.page.unwrap_or(1), query.page_size)
        .await?;

    Ok(HttpResponse::Ok().json(AuditPage {
        items: entries.into_iter().map(Into::into).collect(),
        pagination,
    }))
}
