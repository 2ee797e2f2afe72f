//! Flag store adapter.
//!
//! All durable flag state lives behind this handle. Every query is scoped
//! by tenant id; nothing here issues an unscoped read or write. Uniqueness
//! of the (tenant, feature, environment) triple is enforced by the store's
//! own index, which also serializes concurrent upserts racing on the same
//! triple.

use super::types::{Environment, Rollout};
use crate::orm::{features, flags};
use chrono::Utc;
use sea_orm::{
    entity::*, query::*, sea_query::Expr, DatabaseConnection, DatabaseTransaction, DbErr, Set,
    TransactionTrait,
};
use std::collections::HashMap;

/// Handle to flag persistence, constructed once at startup.
#[derive(Clone)]
pub struct FlagStore {
    db: DatabaseConnection,
}

impl FlagStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Whether the referenced feature exists at all. Backs the
    /// feature-not-found condition on upsert, distinct from generic failure.
    pub async fn feature_exists(&self, feature_id: i32) -> Result<bool, DbErr> {
        let feature = features::Entity::find_by_id(feature_id).one(&self.db).await?;
        Ok(feature.is_some())
    }

    /// Point lookup by natural key.
    pub async fn find_one(
        &self,
        tenant_id: i32,
        feature_id: i32,
        env: Environment,
    ) -> Result<Option<flags::Model>, DbErr> {
        flags::Entity::find()
            .filter(flags::Column::TenantId.eq(tenant_id))
            .filter(flags::Column::FeatureId.eq(feature_id))
            .filter(flags::Column::Environment.eq(env.as_str()))
            .one(&self.db)
            .await
    }

    /// Lookup by record id, scoped to the tenant. A record owned by another
    /// tenant is indistinguishable from an absent one.
    pub async fn find_by_id(
        &self,
        flag_id: i32,
        tenant_id: i32,
    ) -> Result<Option<flags::Model>, DbErr> {
        flags::Entity::find()
            .filter(flags::Column::Id.eq(flag_id))
            .filter(flags::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await
    }

    /// Create-or-replace the record for a triple. Non-key fields are fully
    /// replaced. Returns the stored record and whether it was newly created.
    pub async fn upsert(
        &self,
        tenant_id: i32,
        feature_id: i32,
        env: Environment,
        enabled: bool,
        rollout: &Rollout,
    ) -> Result<(flags::Model, bool), DbErr> {
        let now = Utc::now().naive_utc();

        match self.find_one(tenant_id, feature_id, env).await? {
            Some(existing) => {
                flags::Entity::update_many()
                    .col_expr(flags::Column::Enabled, Expr::value(enabled))
                    .col_expr(flags::Column::Strategy, Expr::value(rollout.strategy()))
                    .col_expr(
                        flags::Column::StrategyValue,
                        Expr::value(rollout.strategy_value()),
                    )
                    .col_expr(flags::Column::UpdatedAt, Expr::value(now))
                    .filter(flags::Column::Id.eq(existing.id))
                    .exec(&self.db)
                    .await?;

                let updated = self
                    .find_one(tenant_id, feature_id, env)
                    .await?
                    .ok_or_else(|| {
                        DbErr::Custom(format!(
                            "Flag for feature {} vanished during upsert",
                            feature_id
                        ))
                    })?;
                Ok((updated, false))
            }
            None => {
                let record = flags::ActiveModel {
                    tenant_id: Set(tenant_id),
                    feature_id: Set(feature_id),
                    environment: Set(env.as_str().to_string()),
                    enabled: Set(enabled),
                    strategy: Set(rollout.strategy().to_string()),
                    strategy_value: Set(rollout.strategy_value()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                let inserted = record.insert(&self.db).await?;
                Ok((inserted, true))
            }
        }
    }

    /// Delete by record id, scoped to the tenant. Returns whether a row was
    /// actually removed.
    pub async fn delete(&self, flag_id: i32, tenant_id: i32) -> Result<bool, DbErr> {
        let result = flags::Entity::delete_many()
            .filter(flags::Column::Id.eq(flag_id))
            .filter(flags::Column::TenantId.eq(tenant_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Paged listing of a tenant's flags in one environment, joined with
    /// their features, plus the total row count for pagination. The optional
    /// filter matches a substring of the feature name.
    pub async fn list(
        &self,
        tenant_id: i32,
        env: Environment,
        filter: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<(flags::Model, features::Model)>, u64), DbErr> {
        // Resolve the name filter to feature ids up front so both the count
        // and the page query share the same scope.
        let matching_features = match filter {
            Some(filter) => {
                let matching = features::Entity::find()
                    .filter(features::Column::Name.contains(filter))
                    .all(&self.db)
                    .await?;
                if matching.is_empty() {
                    return Ok((Vec::new(), 0));
                }
                Some(matching.iter().map(|f| f.id).collect::<Vec<i32>>())
            }
            None => None,
        };

        let total = scoped_query(tenant_id, env, matching_features.clone())
            .count(&self.db)
            .await? as u64;

        let rows = scoped_query(tenant_id, env, matching_features)
            .order_by_asc(flags::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?;

        if rows.is_empty() {
            return Ok((Vec::new(), total));
        }

        let feature_ids: Vec<i32> = rows.iter().map(|r| r.feature_id).collect();
        let features_by_id: HashMap<i32, features::Model> = features::Entity::find()
            .filter(features::Column::Id.is_in(feature_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|f| (f.id, f))
            .collect();

        let joined = rows
            .into_iter()
            .filter_map(|flag| match features_by_id.get(&flag.feature_id) {
                Some(feature) => Some((flag, feature.clone())),
                None => {
                    log::warn!(
                        "Flag {} references missing feature {}",
                        flag.id,
                        flag.feature_id
                    );
                    None
                }
            })
            .collect();

        Ok((joined, total))
    }

    /// All of a tenant's flags in one environment, for promotion.
    pub async fn list_all(
        &self,
        tenant_id: i32,
        env: Environment,
    ) -> Result<Vec<flags::Model>, DbErr> {
        flags::Entity::find()
            .filter(flags::Column::TenantId.eq(tenant_id))
            .filter(flags::Column::Environment.eq(env.as_str()))
            .order_by_asc(flags::Column::Id)
            .all(&self.db)
            .await
    }

    /// Upsert every source record into the target environment as a single
    /// transaction. Either all records land or, on any failure before
    /// commit, none do.
    pub async fn promote_records(
        &self,
        tenant_id: i32,
        target: Environment,
        records: &[flags::Model],
    ) -> Result<u64, DbErr> {
        let txn = self.db.begin().await?;
        let promoted = copy_into(&txn, tenant_id, target, records).await?;
        txn.commit().await?;
        Ok(promoted)
    }
}

/// Tenant- and environment-scoped base query, optionally narrowed to a set
/// of feature ids resolved from a name filter.
fn scoped_query(
    tenant_id: i32,
    env: Environment,
    feature_ids: Option<Vec<i32>>,
) -> sea_orm::Select<flags::Entity> {
    let query = flags::Entity::find()
        .filter(flags::Column::TenantId.eq(tenant_id))
        .filter(flags::Column::Environment.eq(env.as_str()));

    match feature_ids {
        Some(ids) => query.filter(flags::Column::FeatureId.is_in(ids)),
        None => query,
    }
}

/// Derive a target-environment row from each source record and upsert it
/// inside the supplied transaction. The target row gets its own identity
/// and timestamps; `enabled`, `strategy`, and `strategy_value` are copied
/// verbatim.
async fn copy_into(
    txn: &DatabaseTransaction,
    tenant_id: i32,
    target: Environment,
    records: &[flags::Model],
) -> Result<u64, DbErr> {
    let now = Utc::now().naive_utc();
    let mut promoted = 0u64;

    for record in records {
        let existing = flags::Entity::find()
            .filter(flags::Column::TenantId.eq(tenant_id))
            .filter(flags::Column::FeatureId.eq(record.feature_id))
            .filter(flags::Column::Environment.eq(target.as_str()))
            .one(txn)
            .await?;

        match existing {
            Some(current) => {
                flags::Entity::update_many()
                    .col_expr(flags::Column::Enabled, Expr::value(record.enabled))
                    .col_expr(flags::Column::Strategy, Expr::value(record.strategy.clone()))
                    .col_expr(
                        flags::Column::StrategyValue,
                        Expr::value(record.strategy_value.clone()),
                    )
                    .col_expr(flags::Column::UpdatedAt, Expr::value(now))
                    .filter(flags::Column::Id.eq(current.id))
                    .exec(txn)
                    .await?;
            }
            None => {
                let derived = flags::ActiveModel {
                    tenant_id: Set(tenant_id),
                    feature_id: Set(record.feature_id),
                    environment: Set(target.as_str().to_string()),
                    enabled: Set(record.enabled),
                    strategy: Set(record.strategy.clone()),
                    strategy_value: Set(record.strategy_value.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                flags::Entity::insert(derived).exec(txn).await?;
            }
        }
        promoted += 1;
    }

    Ok(promoted)
}
