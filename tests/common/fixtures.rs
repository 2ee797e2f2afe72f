//! Test fixtures for creating test data
#![allow(dead_code)]

use super::database::get_test_cache;
use chrono::Utc;
use flagstaff::app_config::LimitsConfig;
use flagstaff::audit::AuditRecorder;
use flagstaff::flags::{Environment, FlagService, FlagStore, Rollout};
use flagstaff::orm::{features, flags, tenants};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Build a flag service wired to the test database and test cache
pub fn test_service(db: &DatabaseConnection) -> FlagService {
    FlagService::new(
        FlagStore::new(db.clone()),
        get_test_cache(),
        AuditRecorder::new(db.clone()),
        &LimitsConfig::default(),
    )
}

/// Create a test tenant
pub async fn create_test_tenant(
    db: &DatabaseConnection,
    name: &str,
) -> Result<tenants::Model, DbErr> {
    let tenant = tenants::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    tenant.insert(db).await
}

/// Create a test feature
pub async fn create_test_feature(
    db: &DatabaseConnection,
    name: &str,
) -> Result<features::Model, DbErr> {
    let feature = features::ActiveModel {
        name: Set(name.to_string()),
        description: Set(Some(format!("{} (test feature)", name))),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    feature.insert(db).await
}

/// Create a flag row directly, bypassing the service layer
pub async fn create_test_flag(
    db: &DatabaseConnection,
    tenant_id: i32,
    feature_id: i32,
    env: Environment,
    enabled: bool,
    rollout: &Rollout,
) -> Result<flags::Model, DbErr> {
    let now = Utc::now().naive_utc();
    let flag = flags::ActiveModel {
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
    flag.insert(db).await
}
