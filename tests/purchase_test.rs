mod common;

use common::{setup_test_db, test_plans};
use lexora_credits::models::common::PurchaseStatus;
use lexora_credits::services::purchase_service::{ProcessStatus, ReceiptTransaction};
use lexora_credits::services::{LedgerService, PurchaseService};
use sea_orm::{entity::*, query::*};
use uuid::Uuid;

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_processing_same_transaction_twice_credits_once() {
    let db = setup_test_db().await;
    let ledger = LedgerService::new(db.clone());
    let service = PurchaseService::new(db, test_plans());

    let user_id = Uuid::new_v4();
    let transaction_id = format!("txn-{}", Uuid::new_v4());
    let now = time::OffsetDateTime::now_utc();

    let first = service
        .process_purchase(user_id, "weekly", &transaction_id, now, Some(499), Some("USD"))
        .await
        .unwrap();
    assert_eq!(first.credited, 100);
    assert_eq!(first.status, ProcessStatus::Granted);

    let second = service
        .process_purchase(user_id, "weekly", &transaction_id, now, Some(499), Some("USD"))
        .await
        .unwrap();
    assert_eq!(second.credited, 0);
    assert_eq!(second.status, ProcessStatus::AlreadyProcessed);

    // Credited exactly once
    let balance = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(balance.total, 100);

    assert!(service.is_processed(&transaction_id).await.unwrap());
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_record_purchase_is_a_noop_on_duplicate() {
    let db = setup_test_db().await;
    let service = PurchaseService::new(db.clone(), test_plans());

    let user_id = Uuid::new_v4();
    let transaction_id = format!("txn-{}", Uuid::new_v4());
    let now = time::OffsetDateTime::now_utc();

    let inserted = service
        .record_purchase(
            user_id,
            "weekly",
            &transaction_id,
            now,
            Some(499),
            Some("USD"),
            PurchaseStatus::Completed,
        )
        .await
        .unwrap();
    assert!(inserted);

    // Same transaction id again: no-op, the original record stands
    let inserted = service
        .record_purchase(
            user_id,
            "monthly",
            &transaction_id,
            now,
            Some(999),
            Some("EUR"),
            PurchaseStatus::Pending,
        )
        .await
        .unwrap();
    assert!(!inserted);

    let purchase = entity::purchases::Entity::find_by_id(transaction_id.clone())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(purchase.product_id, "weekly");
    assert_eq!(purchase.price_cents, Some(499));

    // Recording alone never credits
    assert!(!service.is_processed(&transaction_id).await.unwrap());
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_unknown_product_records_but_credits_nothing() {
    let db = setup_test_db().await;
    let ledger = LedgerService::new(db.clone());
    let service = PurchaseService::new(db, test_plans());

    let user_id = Uuid::new_v4();
    let transaction_id = format!("txn-{}", Uuid::new_v4());

    let outcome = service
        .process_purchase(
            user_id,
            "com.lexora.cosmetic.theme",
            &transaction_id,
            time::OffsetDateTime::now_utc(),
            Some(199),
            Some("USD"),
        )
        .await
        .unwrap();
    assert_eq!(outcome.credited, 0);
    assert_eq!(outcome.status, ProcessStatus::NoCredit);

    let balance = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(balance.total, 0);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_receipt_transactions_are_credited_independently() {
    let db = setup_test_db().await;
    let ledger = LedgerService::new(db.clone());
    let service = PurchaseService::new(db, test_plans());

    let user_id = Uuid::new_v4();
    let now = time::OffsetDateTime::now_utc();
    let txn_a = format!("txn-{}", Uuid::new_v4());
    let txn_b = format!("txn-{}", Uuid::new_v4());

    // A receipt bundling two fresh transactions and a duplicate of the first
    let receipt = vec![
        ReceiptTransaction {
            transaction_id: txn_a.clone(),
            purchase_date: now - time::Duration::hours(2),
            price_cents: Some(499),
            currency: Some("USD".to_string()),
        },
        ReceiptTransaction {
            transaction_id: txn_b.clone(),
            purchase_date: now,
            price_cents: Some(499),
            currency: Some("USD".to_string()),
        },
        ReceiptTransaction {
            transaction_id: txn_a.clone(),
            purchase_date: now - time::Duration::hours(2),
            price_cents: Some(499),
            currency: Some("USD".to_string()),
        },
    ];

    let outcome = service
        .process_receipt(user_id, "weekly", &receipt)
        .await
        .unwrap();

    // The duplicate is suppressed without blocking its siblings
    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.already_processed, 1);
    assert_eq!(outcome.total_credited, 200);
    assert!(outcome.failed.is_empty());

    let balance = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(balance.total, 200);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_weekly_purchase_end_to_end() {
    let db = setup_test_db().await;
    let ledger = LedgerService::new(db.clone());
    let service = PurchaseService::new(db.clone(), test_plans());

    let user_id = Uuid::new_v4();
    let now = time::OffsetDateTime::now_utc();

    // User starts with no credits
    assert_eq!(ledger.get_balance(user_id).await.unwrap().total, 0);

    // Purchase of the weekly plan grants 100 credits valid for 7 days
    let transaction_id = format!("tx1-{}", user_id);
    let outcome = service
        .process_purchase(user_id, "weekly", &transaction_id, now, Some(499), Some("USD"))
        .await
        .unwrap();
    assert_eq!(outcome.credited, 100);

    let batches = ledger.list_expiring(user_id).await.unwrap();
    assert_eq!(batches.len(), 1);
    let valid_for = batches[0].expires_at - now;
    assert!(valid_for > time::Duration::days(6) && valid_for < time::Duration::days(8));

    // Spending works against the granted batch
    let receipt = ledger.spend(user_id, 30).await.unwrap();
    assert_eq!(receipt.remaining, 70);

    // Re-delivering the same purchase event grants nothing
    let replay = service
        .process_purchase(user_id, "weekly", &transaction_id, now, Some(499), Some("USD"))
        .await
        .unwrap();
    assert_eq!(replay.credited, 0);
    assert_eq!(ledger.get_balance(user_id).await.unwrap().total, 70);

    // Simulate 8 days passing by back-dating the batch expiry
    let batch = ledger.list_expiring(user_id).await.unwrap().remove(0);
    let mut active: entity::expiring_credit_batches::ActiveModel = batch.into();
    active.expires_at = Set(now - time::Duration::days(1));
    active.update(&db).await.unwrap();

    // The leftover credits expired with the batch
    assert_eq!(ledger.get_balance(user_id).await.unwrap().total, 0);
}
