mod common;

use common::{setup_test_db, test_plans};
use lexora_credits::services::restoration_service::{
    OwnedPurchase, RestoreItemStatus, SkipReason,
};
use lexora_credits::services::{LedgerService, PurchaseService, RestorationService};
use lexora_credits::ApiError;
use sea_orm::{entity::*, query::*};
use uuid::Uuid;

fn service(db: sea_orm::DatabaseConnection) -> RestorationService {
    RestorationService::new(db, test_plans(), 24)
}

fn owned(
    product_id: &str,
    transaction_id: Option<String>,
    purchase_date: time::OffsetDateTime,
) -> OwnedPurchase {
    OwnedPurchase {
        product_id: product_id.to_string(),
        transaction_id,
        purchase_date,
    }
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_restores_purchase_that_was_never_credited() {
    let db = setup_test_db().await;
    let ledger = LedgerService::new(db.clone());
    let restoration = service(db.clone());

    let user_id = Uuid::new_v4();
    let transaction_id = format!("txn-{}", Uuid::new_v4());
    let purchased = time::OffsetDateTime::now_utc() - time::Duration::hours(1);

    let summary = restoration
        .verify_and_restore(
            user_id,
            &[owned("weekly", Some(transaction_id.clone()), purchased)],
        )
        .await
        .unwrap();

    assert_eq!(summary.restored_count, 1);
    assert_eq!(summary.restored_credits, 100);
    assert_eq!(summary.errors, 0);

    // The purchase row exists now and is flagged as restored
    let purchase = entity::purchases::Entity::find_by_id(transaction_id.clone())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(purchase.restored);
    assert_eq!(purchase.credit_status, "granted");

    // Audit row carries the verification reason
    let audits = entity::credit_restorations::Entity::find()
        .filter(entity::credit_restorations::Column::TransactionId.eq(transaction_id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].reason, "verification");
    assert_eq!(audits[0].status, "success");

    assert_eq!(ledger.get_balance(user_id).await.unwrap().total, 100);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_already_processed_purchase_is_not_restored_again() {
    let db = setup_test_db().await;
    let purchases = PurchaseService::new(db.clone(), test_plans());
    let restoration = service(db.clone());

    let user_id = Uuid::new_v4();
    let transaction_id = format!("txn-{}", Uuid::new_v4());
    let purchased = time::OffsetDateTime::now_utc() - time::Duration::minutes(30);

    purchases
        .process_purchase(user_id, "weekly", &transaction_id, purchased, Some(499), Some("USD"))
        .await
        .unwrap();

    assert!(restoration
        .is_transaction_restored(&transaction_id)
        .await
        .unwrap());

    let summary = restoration
        .verify_and_restore(
            user_id,
            &[owned("weekly", Some(transaction_id), purchased)],
        )
        .await
        .unwrap();

    assert_eq!(summary.restored_count, 0);
    assert_eq!(summary.restored_credits, 0);
    assert_eq!(summary.skipped, 1);
    assert!(matches!(
        summary.details[0].status,
        RestoreItemStatus::Skipped {
            reason: SkipReason::AlreadyRestored
        }
    ));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_stale_purchase_is_skipped_by_automatic_restore() {
    let db = setup_test_db().await;
    let restoration = service(db.clone());

    let user_id = Uuid::new_v4();
    let transaction_id = format!("txn-{}", Uuid::new_v4());
    let purchased = time::OffsetDateTime::now_utc() - time::Duration::hours(25);

    let summary = restoration
        .verify_and_restore(
            user_id,
            &[owned("weekly", Some(transaction_id.clone()), purchased)],
        )
        .await
        .unwrap();

    assert_eq!(summary.restored_count, 0);
    assert_eq!(summary.skipped, 1);
    assert!(matches!(
        summary.details[0].status,
        RestoreItemStatus::Skipped {
            reason: SkipReason::StalePurchase
        }
    ));

    // No successful audit record was written for the stale purchase
    let audits = entity::credit_restorations::Entity::find()
        .filter(entity::credit_restorations::Column::TransactionId.eq(transaction_id))
        .filter(entity::credit_restorations::Column::Status.eq("success"))
        .all(&db)
        .await
        .unwrap();
    assert!(audits.is_empty());
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_owned_purchase_without_transaction_id_is_an_error() {
    let db = setup_test_db().await;
    let restoration = service(db);

    let user_id = Uuid::new_v4();
    let purchased = time::OffsetDateTime::now_utc() - time::Duration::hours(1);

    let summary = restoration
        .verify_and_restore(user_id, &[owned("weekly", None, purchased)])
        .await
        .unwrap();

    assert_eq!(summary.restored_count, 0);
    assert_eq!(summary.errors, 1);
    assert!(matches!(
        summary.details[0].status,
        RestoreItemStatus::Error { .. }
    ));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_verification_pass_is_safely_retriable() {
    let db = setup_test_db().await;
    let restoration = service(db);

    let user_id = Uuid::new_v4();
    let items = vec![
        owned(
            "weekly",
            Some(format!("txn-{}", Uuid::new_v4())),
            time::OffsetDateTime::now_utc() - time::Duration::hours(2),
        ),
        owned(
            "monthly",
            Some(format!("txn-{}", Uuid::new_v4())),
            time::OffsetDateTime::now_utc() - time::Duration::hours(3),
        ),
    ];

    let first = restoration
        .verify_and_restore(user_id, &items)
        .await
        .unwrap();
    assert_eq!(first.restored_count, 2);
    assert_eq!(first.restored_credits, 600);

    // The retry observes a zero balance delta
    let second = restoration
        .verify_and_restore(user_id, &items)
        .await
        .unwrap();
    assert_eq!(second.restored_count, 0);
    assert_eq!(second.restored_credits, 0);
    assert_eq!(second.skipped, 2);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_manual_restore_overrides_freshness_window() {
    let db = setup_test_db().await;
    let ledger = LedgerService::new(db.clone());
    let restoration = service(db.clone());

    let user_id = Uuid::new_v4();
    let transaction_id = format!("txn-{}", Uuid::new_v4());
    let purchased = time::OffsetDateTime::now_utc() - time::Duration::days(30);

    let outcome = restoration
        .manual_restore(user_id, "weekly", &transaction_id, purchased)
        .await
        .unwrap();
    assert_eq!(outcome.credited, 100);
    assert!(!outcome.already_restored);

    // The duplicate guard still applies on the manual path
    let replay = restoration
        .manual_restore(user_id, "weekly", &transaction_id, purchased)
        .await
        .unwrap();
    assert_eq!(replay.credited, 0);
    assert!(replay.already_restored);

    assert_eq!(ledger.get_balance(user_id).await.unwrap().total, 100);

    let audits = entity::credit_restorations::Entity::find()
        .filter(entity::credit_restorations::Column::TransactionId.eq(transaction_id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].reason, "manual_restore");
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_manual_restore_of_non_crediting_product_is_rejected() {
    let db = setup_test_db().await;
    let restoration = service(db);

    let result = restoration
        .manual_restore(
            Uuid::new_v4(),
            "com.lexora.cosmetic.theme",
            "txn-any",
            time::OffsetDateTime::now_utc(),
        )
        .await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_restoration_stats_aggregate_the_audit_log() {
    let db = setup_test_db().await;
    let restoration = service(db);

    let user_id = Uuid::new_v4();

    let empty = restoration.get_restoration_stats(user_id).await.unwrap();
    assert_eq!(empty.total_restorations, 0);
    assert_eq!(empty.successful_restorations, 0);
    assert_eq!(empty.total_credits_restored, 0);
    assert!(empty.last_restoration_date.is_none());

    restoration
        .verify_and_restore(
            user_id,
            &[
                owned(
                    "weekly",
                    Some(format!("txn-{}", Uuid::new_v4())),
                    time::OffsetDateTime::now_utc() - time::Duration::hours(1),
                ),
                owned(
                    "monthly",
                    Some(format!("txn-{}", Uuid::new_v4())),
                    time::OffsetDateTime::now_utc() - time::Duration::hours(1),
                ),
            ],
        )
        .await
        .unwrap();

    let stats = restoration.get_restoration_stats(user_id).await.unwrap();
    assert_eq!(stats.total_restorations, 2);
    assert_eq!(stats.successful_restorations, 2);
    assert_eq!(stats.total_credits_restored, 600);
    assert!(stats.last_restoration_date.is_some());
}
