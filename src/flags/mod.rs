//! Flag evaluation, caching, and promotion.
//!
//! `FlagService` is the single entry point the HTTP layer talks to. It is
//! built once at startup from explicit store/cache/audit handles and shared
//! across workers; it owns the read-through caching policy and the audit
//! and invalidation contract for every mutation.

pub mod cache;
pub mod evaluate;
pub mod promote;
pub mod store;
pub mod types;

pub use cache::FlagCache;
pub use store::FlagStore;
pub use types::{
    CachedFlagPage, Environment, EvaluatedFlag, FlagPage, PageSource, Pagination, Rollout,
};

use crate::app_config::LimitsConfig;
use crate::audit::{self, AuditAction, AuditRecorder};
use crate::error::ServiceError;
use crate::orm::{audit_log, flags};
use serde_json::json;

/// Audit-diff snapshot of one flag record.
pub fn flag_snapshot(record: &flags::Model) -> serde_json::Value {
    json!({
        "feature_id": record.feature_id,
        "environment": record.environment,
        "enabled": record.enabled,
        "strategy": record.strategy,
        "strategy_value": record.strategy_value,
    })
}

#[derive(Clone)]
pub struct FlagService {
    store: FlagStore,
    cache: FlagCache,
    audit: AuditRecorder,
    default_page_size: u64,
    max_page_size: u64,
}

impl FlagService {
    pub fn new(
        store: FlagStore,
        cache: FlagCache,
        audit: AuditRecorder,
        limits: &LimitsConfig,
    ) -> Self {
        Self {
            store,
            cache,
            audit,
            default_page_size: limits.default_page_size,
            max_page_size: limits.max_page_size,
        }
    }

    /// Evaluated page of a tenant's flags in one environment.
    ///
    /// Only the canonical shape (first page, default page size, no filter)
    /// goes through the cache; every other shape bypasses it entirely. A
    /// database read evaluates each record fresh and, when canonical,
    /// repopulates the cache.
    pub async fn evaluate_flags(
        &self,
        tenant_id: i32,
        env: Environment,
        page: u64,
        page_size: Option<u64>,
        filter: Option<String>,
    ) -> Result<FlagPage, ServiceError> {
        let page = page.max(1);
        let page_size = page_size
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);
        let canonical = page == 1 && page_size == self.default_page_size && filter.is_none();

        if canonical {
            if let Some(cached) = self.cache.get_page(tenant_id, env).await {
                return Ok(FlagPage {
                    source: PageSource::Cache,
                    pagination: Pagination {
                        page,
                        page_size,
                        total: cached.total,
                    },
                    items: cached.items,
                });
            }
        }

        let offset = (page - 1) * page_size;
        let (rows, total) = self
            .store
            .list(tenant_id, env, filter.as_deref(), offset, page_size)
            .await?;

        let items: Vec<EvaluatedFlag> = rows
            .into_iter()
            .map(|(flag, feature)| {
                let rollout = Rollout::from_stored(&flag.strategy, flag.strategy_value.as_ref());
                let enabled = evaluate::evaluate(tenant_id, &feature.name, flag.enabled, &rollout);
                EvaluatedFlag {
                    id: flag.id,
                    feature: feature.name,
                    description: feature.description,
                    enabled,
                }
            })
            .collect();

        if canonical {
            self.cache
                .put_page(
                    tenant_id,
                    env,
                    &CachedFlagPage {
                        items: items.clone(),
                        total,
                    },
                )
                .await;
        }

        Ok(FlagPage {
            source: PageSource::Database,
            items,
            pagination: Pagination {
                page,
                page_size,
                total,
            },
        })
    }

    /// Create or fully replace the flag for (tenant, feature, environment).
    ///
    /// The audit entry and cache invalidation both complete before this
    /// returns success.
    pub async fn upsert_flag(
        &self,
        tenant_id: i32,
        actor: &str,
        feature_id: i32,
        env: Environment,
        enabled: bool,
        rollout: Rollout,
    ) -> Result<flags::Model, ServiceError> {
        if !self.store.feature_exists(feature_id).await? {
            return Err(ServiceError::NotFound(format!(
                "Feature {} does not exist.",
                feature_id
            )));
        }

        let before = self.store.find_one(tenant_id, feature_id, env).await?;
        let (record, created) = self
            .store
            .upsert(tenant_id, feature_id, env, enabled, &rollout)
            .await?;

        let action = if created {
            AuditAction::Create
        } else {
            AuditAction::Update
        };
        let diff = audit::change_diff(
            before.as_ref().map(flag_snapshot),
            Some(flag_snapshot(&record)),
        );
        self.audit
            .record(
                tenant_id,
                actor,
                action,
                audit::ENTITY_FLAG,
                record.id.to_string(),
                Some(diff),
            )
            .await;

        self.cache.invalidate(tenant_id, env).await;

        Ok(record)
    }

    /// Delete one flag by id. A flag owned by another tenant reads as
    /// absent and nothing is mutated.
    pub async fn delete_flag(
        &self,
        tenant_id: i32,
        actor: &str,
        flag_id: i32,
    ) -> Result<(), ServiceError> {
        let existing = self
            .store
            .find_by_id(flag_id, tenant_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Flag {} does not exist.", flag_id))
            })?;

        if !self.store.delete(flag_id, tenant_id).await? {
            // Lost a race with a concurrent deleter.
            return Err(ServiceError::NotFound(format!(
                "Flag {} does not exist.",
                flag_id
            )));
        }

        let diff = audit::change_diff(Some(flag_snapshot(&existing)), None);
        self.audit
            .record(
                tenant_id,
                actor,
                AuditAction::Delete,
                audit::ENTITY_FLAG,
                flag_id.to_string(),
                Some(diff),
            )
            .await;

        if let Ok(env) = existing.environment.parse::<Environment>() {
            self.cache.invalidate(tenant_id, env).await;
        }

        Ok(())
    }

    /// Promote every flag in `source` to `target` for this tenant.
    pub async fn promote(
        &self,
        tenant_id: i32,
        actor: &str,
        source: Environment,
        target: Environment,
    ) -> Result<u64, ServiceError> {
        promote::promote_environment(
            &self.store,
            &self.cache,
            &self.audit,
            tenant_id,
            actor,
            source,
            target,
        )
        .await
    }

    /// Newest-first page of the tenant's audit trail.
    pub async fn audit_trail(
        &self,
        tenant_id: i32,
        page: u64,
        page_size: Option<u64>,
    ) -> Result<(Vec<audit_log::Model>, Pagination), ServiceError> {
        let page = page.max(1);
        let page_size = page_size
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);
        let offset = (page - 1) * page_size;

        let (entries, total) = self.audit.list_for_tenant(tenant_id, offset, page_size).await?;

        Ok((
            entries,
            Pagination {
                page,
                page_size,
                total,
            },
        ))
    }
}
