//! Flag endpoints: evaluated listings, upserts, deletes, and promotions.

use crate::error::ServiceError;
use crate::flags::{Environment, FlagService, Rollout};
use crate::orm::flags;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_flags)
        .service(upsert_flag)
        .service(delete_flag)
        .service(promote_environment);
}

/// Actor identity for audit entries. Authentication happens upstream; the
/// gateway forwards the authenticated principal in this header.
fn actor_from(req: &HttpRequest) -> String {
    req.headers()
        .get("X-Actor")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("system")
        .to_string()
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub filter: Option<String>,
}

#[get("/tenants/{tenant_id}/environments/{env}/flags")]
async fn list_flags(
    service: web::Data<FlagService>,
    path: web::Path<(i32, String)>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ServiceError> {
    let (tenant_id, env) = path.into_inner();
    let env: Environment = env.parse()?;
    let query = query.into_inner();

    let page = service
        .evaluate_flags(
            tenant_id,
            env,
            query.page.unwrap_or(1),
            query.page_size,
            query.filter,
        )
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertFlagRequest {
    #[validate(range(min = 1))]
    pub feature_id: i32,
    pub enabled: bool,
    #[validate(length(min = 1))]
    pub strategy: String,
    pub strategy_value: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct FlagResponse {
    pub id: i32,
    pub tenant_id: i32,
    pub feature_id: i32,
    pub environment: String,
    pub enabled: bool,
    pub strategy: String,
    pub strategy_value: Option<serde_json::Value>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl From<flags::Model> for FlagResponse {
    fn from(record: flags::Model) -> Self {
        Self {
            id: record.id,
            tenant_id: record.tenant_id,
            feature_id: record.feature_id,
            environment: record.environment,
            enabled: record.enabled,
            strategy: record.strategy,
            strategy_value: record.strategy_value,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[put("/tenants/{tenant_id}/environments/{env}/flags")]
async fn upsert_flag(
    req: HttpRequest,
    service: web::Data<FlagService>,
    path: web::Path<(i32, String)>,
    body: web::Json<UpsertFlagRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (tenant_id, env) = path.into_inner();
    let env: Environment = env.parse()?;
    let body = body.into_inner();
    body.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    let rollout = Rollout::from_parts(&body.strategy, body.strategy_value)?;
    let record = service
        .upsert_flag(
            tenant_id,
            &actor_from(&req),
            body.feature_id,
            env,
            body.enabled,
            rollout,
        )
        .await?;

    Ok(HttpResponse::Ok().json(FlagResponse::from(record)))
}

#[delete("/tenants/{tenant_id}/flags/{flag_id}")]
async fn delete_flag(
    req: HttpRequest,
    service: web::Data<FlagService>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, ServiceError> {
    let (tenant_id, flag_id) = path.into_inner();

    service
        .delete_flag(tenant_id, &actor_from(&req), flag_id)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize, Validate)]
pub struct PromoteRequest {
    #[validate(length(min = 1))]
    pub source: String,
    #[validate(length(min = 1))]
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct PromoteResponse {
    pub source: Environment,
    pub target: Environment,
    pub promoted: u64,
}

#[post("/tenants/{tenant_id}/promotions")]
async fn promote_environment(
    req: HttpRequest,
    service: web::Data<FlagService>,
    path: web::Path<i32>,
    body: web::Json<PromoteRequest>,
) -> Result<HttpResponse, ServiceError> {
    let tenant_id = path.into_inner();
    let body = body.into_inner();
    body.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    let source: Environment = body.source.parse()?;
    let target: Environment = body.target.parse()?;

    let promoted = service
        .promote(tenant_id, &actor_from(&req), source, target)
        .await?;

    Ok(HttpResponse::Ok().json(PromoteResponse {
        source,
        target,
        promoted,
    }))
}
