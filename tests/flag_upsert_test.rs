//! Flag upsert and delete integration tests

mod common;

use common::database::{cleanup_test_data, setup_test_database};
use common::fixtures::{create_test_feature, create_test_tenant, test_service};
use flagstaff::error::ServiceError;
use flagstaff::flags::{Environment, Rollout};
use flagstaff::orm::{audit_log, flags};
use sea_orm::{entity::*, query::*};
use serde_json::json;
use serial_test::serial;

#[actix_rt::test]
#[serial]
async fn test_upsert_creates_then_updates() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to clean up");

    let tenant = create_test_tenant(&db, "acme").await.unwrap();
    let feature = create_test_feature(&db, "new-dashboard").await.unwrap();
    let service = test_service(&db);

    let first = service
        .upsert_flag(
            tenant.id,
            "alice",
            feature.id,
            Environment::Dev,
            true,
            Rollout::Boolean,
        )
        .await
        .expect("First upsert failed");

    let second = service
        .upsert_flag(
            tenant.id,
            "alice",
            feature.id,
            Environment::Dev,
            false,
            Rollout::Percentage { percentage: 30 },
        )
        .await
        .expect("Second upsert failed");

    // Same triple, same row; the second call replaced the non-key fields.
    assert_eq!(first.id, second.id);

    let rows = flags::Entity::find()
        .filter(flags::Column::TenantId.eq(tenant.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1, "Exactly one record per triple");
    assert!(!rows[0].enabled);
    assert_eq!(rows[0].strategy, "PERCENTAGE");
    assert_eq!(rows[0].strategy_value, Some(json!({"percentage": 30})));

    let entries = audit_log::Entity::find()
        .filter(audit_log::Column::TenantId.eq(tenant.id))
        .order_by_asc(audit_log::Column::Id)
        .all(&db)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, "CREATE");
    assert_eq!(entries[1].action, "UPDATE");
    assert_eq!(entries[0].actor, "alice");
    assert_eq!(entries[0].entity_kind, "flag");
    assert_eq!(entries[0].entity_id, first.id.to_string());

    let create_diff = entries[0].diff.as_ref().unwrap();
    assert!(create_diff["before"].is_null());
    assert_eq!(create_diff["after"]["enabled"], json!(true));

    let update_diff = entries[1].diff.as_ref().unwrap();
    assert_eq!(update_diff["before"]["enabled"], json!(true));
    assert_eq!(update_diff["after"]["enabled"], json!(false));
    assert_eq!(update_diff["after"]["strategy"], json!("PERCENTAGE"));

    cleanup_test_data(&db).await.unwrap();
}

#[actix_rt::test]
#[serial]
async fn test_upsert_unknown_feature_is_not_found() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to clean up");

    let tenant = create_test_tenant(&db, "acme").await.unwrap();
    let service = test_service(&db);

    let err = service
        .upsert_flag(
            tenant.id,
            "alice",
            999_999,
            Environment::Dev,
            true,
            Rollout::Boolean,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // No mutation, no audit entry.
    let flag_count = flags::Entity::find().count(&db).await.unwrap();
    assert_eq!(flag_count, 0);
    let audit_count = audit_log::Entity::find().count(&db).await.unwrap();
    assert_eq!(audit_count, 0);

    cleanup_test_data(&db).await.unwrap();
}

#[actix_rt::test]
#[serial]
async fn test_delete_removes_row_and_records_audit() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to clean up");

    let tenant = create_test_tenant(&db, "acme").await.unwrap();
    let feature = create_test_feature(&db, "new-dashboard").await.unwrap();
    let service = test_service(&db);

    let record = service
        .upsert_flag(
            tenant.id,
            "alice",
            feature.id,
            Environment::Staging,
            true,
            Rollout::Boolean,
        )
        .await
        .unwrap();

    service
        .delete_flag(tenant.id, "bob", record.id)
        .await
        .expect("Delete failed");

    let flag_count = flags::Entity::find().count(&db).await.unwrap();
    assert_eq!(flag_count, 0);

    let entries = audit_log::Entity::find()
        .order_by_asc(audit_log::Column::Id)
        .all(&db)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].action, "DELETE");
    assert_eq!(entries[1].actor, "bob");

    let delete_diff = entries[1].diff.as_ref().unwrap();
    assert_eq!(delete_diff["before"]["enabled"], json!(true));
    assert!(delete_diff["after"].is_null());

    cleanup_test_data(&db).await.unwrap();
}

#[actix_rt::test]
#[serial]
async fn test_delete_absent_flag_is_not_found() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to clean up");

    let tenant = create_test_tenant(&db, "acme").await.unwrap();
    let service = test_service(&db);

    let err = service
        .delete_flag(tenant.id, "alice", 424_242)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    cleanup_test_data(&db).await.unwrap();
}
