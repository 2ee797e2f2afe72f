//! Environment promotion integration tests

mod common;

use common::database::{cleanup_test_data, setup_test_database};
use common::fixtures::{create_test_feature, create_test_flag, create_test_tenant, test_service};
use flagstaff::error::ServiceError;
use flagstaff::flags::{Environment, FlagStore, Rollout};
use flagstaff::orm::{audit_log, flags};
use sea_orm::{entity::*, query::*};
use serde_json::json;
use serial_test::serial;

#[actix_rt::test]
#[serial]
async fn test_promotion_copies_flag_set() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to clean up");

    let tenant = create_test_tenant(&db, "acme").await.unwrap();
    let checkout = create_test_feature(&db, "checkout-redesign").await.unwrap();
    let search = create_test_feature(&db, "search-ranking").await.unwrap();
    let service = test_service(&db);

    let staging_checkout = service
        .upsert_flag(
            tenant.id,
            "alice",
            checkout.id,
            Environment::Staging,
            true,
            Rollout::Boolean,
        )
        .await
        .unwrap();
    let staging_search = service
        .upsert_flag(
            tenant.id,
            "alice",
            search.id,
            Environment::Staging,
            true,
            Rollout::Percentage { percentage: 50 },
        )
        .await
        .unwrap();

    let promoted = service
        .promote(tenant.id, "release-bot", Environment::Staging, Environment::Prod)
        .await
        .expect("Promotion failed");
    assert_eq!(promoted, 2);

    let prod_rows = flags::Entity::find()
        .filter(flags::Column::TenantId.eq(tenant.id))
        .filter(flags::Column::Environment.eq("prod"))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(prod_rows.len(), 2);

    let prod_checkout = prod_rows
        .iter()
        .find(|r| r.feature_id == checkout.id)
        .expect("checkout flag missing in prod");
    assert!(prod_checkout.enabled);
    assert_eq!(prod_checkout.strategy, "BOOLEAN");
    assert_eq!(prod_checkout.strategy_value, None);
    // The target record has its own identity.
    assert_ne!(prod_checkout.id, staging_checkout.id);

    let prod_search = prod_rows
        .iter()
        .find(|r| r.feature_id == search.id)
        .expect("search flag missing in prod");
    assert!(prod_search.enabled);
    assert_eq!(prod_search.strategy, "PERCENTAGE");
    assert_eq!(prod_search.strategy_value, Some(json!({"percentage": 50})));
    assert_ne!(prod_search.id, staging_search.id);

    // One summary entry for the whole bulk event.
    let promote_entries = audit_log::Entity::find()
        .filter(audit_log::Column::TenantId.eq(tenant.id))
        .filter(audit_log::Column::Action.eq("PROMOTE"))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(promote_entries.len(), 1);
    assert_eq!(promote_entries[0].actor, "release-bot");
    assert_eq!(promote_entries[0].entity_kind, "environment");
    assert_eq!(promote_entries[0].entity_id, "prod");

    let diff = promote_entries[0].diff.as_ref().unwrap();
    assert_eq!(diff["source_env"], "staging");
    assert_eq!(diff["target_env"], "prod");
    assert_eq!(diff["promoted_count"], 2);

    cleanup_test_data(&db).await.unwrap();
}

#[actix_rt::test]
#[serial]
async fn test_promotion_overwrites_existing_target_records() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to clean up");

    let tenant = create_test_tenant(&db, "acme").await.unwrap();
    let feature = create_test_feature(&db, "checkout-redesign").await.unwrap();
    let service = test_service(&db);

    service
        .upsert_flag(
            tenant.id,
            "alice",
            feature.id,
            Environment::Staging,
            false,
            Rollout::Boolean,
        )
        .await
        .unwrap();
    service
        .upsert_flag(
            tenant.id,
            "alice",
            feature.id,
            Environment::Prod,
            true,
            Rollout::Percentage { percentage: 80 },
        )
        .await
        .unwrap();

    let promoted = service
        .promote(tenant.id, "release-bot", Environment::Staging, Environment::Prod)
        .await
        .unwrap();
    assert_eq!(promoted, 1);

    // Still one record per triple, now carrying staging's data.
    let prod_rows = flags::Entity::find()
        .filter(flags::Column::TenantId.eq(tenant.id))
        .filter(flags::Column::Environment.eq("prod"))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(prod_rows.len(), 1);
    assert!(!prod_rows[0].enabled);
    assert_eq!(prod_rows[0].strategy, "BOOLEAN");
    assert_eq!(prod_rows[0].strategy_value, None);

    cleanup_test_data(&db).await.unwrap();
}

#[actix_rt::test]
#[serial]
async fn test_same_environment_pair_is_rejected_before_store_access() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to clean up");

    let tenant = create_test_tenant(&db, "acme").await.unwrap();
    let feature = create_test_feature(&db, "checkout-redesign").await.unwrap();
    let service = test_service(&db);

    service
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

    let err = service
        .promote(tenant.id, "release-bot", Environment::Staging, Environment::Staging)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    // Rejected before any side effect: no PROMOTE entry exists.
    let promote_entries = audit_log::Entity::find()
        .filter(audit_log::Column::Action.eq("PROMOTE"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(promote_entries, 0);

    cleanup_test_data(&db).await.unwrap();
}

#[actix_rt::test]
#[serial]
async fn test_empty_source_environment_is_not_found() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to clean up");

    let tenant = create_test_tenant(&db, "acme").await.unwrap();
    let service = test_service(&db);

    let err = service
        .promote(tenant.id, "release-bot", Environment::Staging, Environment::Prod)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let promote_entries = audit_log::Entity::find()
        .filter(audit_log::Column::Action.eq("PROMOTE"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(promote_entries, 0);

    cleanup_test_data(&db).await.unwrap();
}

#[actix_rt::test]
#[serial]
async fn test_failed_promotion_leaves_target_untouched() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to clean up");

    let tenant = create_test_tenant(&db, "acme").await.unwrap();
    let store = FlagStore::new(db.clone());

    for name in ["feature-one", "feature-two", "feature-three"] {
        let feature = create_test_feature(&db, name).await.unwrap();
        create_test_flag(
            &db,
            tenant.id,
            feature.id,
            Environment::Staging,
            true,
            &Rollout::Boolean,
        )
        .await
        .unwrap();
    }

    let mut records = store
        .list_all(tenant.id, Environment::Staging)
        .await
        .unwrap();
    assert_eq!(records.len(), 3);

    // Force a failure mid-batch: the second derived upsert references a
    // feature that does not exist, violating the foreign key.
    records[1].feature_id = 999_999;

    let result = store
        .promote_records(tenant.id, Environment::Prod, &records)
        .await;
    assert!(result.is_err(), "Poisoned batch must fail");

    // All-or-nothing: the first record's successful upsert was rolled back
    // with the rest.
    let prod_count = flags::Entity::find()
        .filter(flags::Column::TenantId.eq(tenant.id))
        .filter(flags::Column::Environment.eq("prod"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(prod_count, 0);

    cleanup_test_data(&db).await.unwrap();
}
