mod common;

use common::setup_test_db;
use lexora_credits::services::LedgerService;
use lexora_credits::ApiError;
use uuid::Uuid;

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_spend_consumes_soonest_expiring_batch_first() {
    let db = setup_test_db().await;
    let ledger = LedgerService::new(db);
    let user_id = Uuid::new_v4();

    let now = time::OffsetDateTime::now_utc();
    ledger
        .add_expiring(user_id, 5, now + time::Duration::days(1))
        .await
        .unwrap();
    ledger
        .add_expiring(user_id, 5, now + time::Duration::days(10))
        .await
        .unwrap();

    let receipt = ledger.spend(user_id, 3).await.unwrap();
    assert_eq!(receipt.spent, 3);
    assert_eq!(receipt.from_expiring, 3);
    assert_eq!(receipt.from_permanent, 0);
    assert_eq!(receipt.remaining, 7);

    // The batch about to expire was drawn down; the later one is untouched
    let batches = ledger.list_expiring(user_id).await.unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].amount, 2);
    assert_eq!(batches[1].amount, 5);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_spend_drains_expiring_before_permanent() {
    let db = setup_test_db().await;
    let ledger = LedgerService::new(db);
    let user_id = Uuid::new_v4();

    ledger.add_permanent(user_id, 50).await.unwrap();
    ledger
        .add_expiring(
            user_id,
            20,
            time::OffsetDateTime::now_utc() + time::Duration::days(2),
        )
        .await
        .unwrap();

    let receipt = ledger.spend(user_id, 30).await.unwrap();
    assert_eq!(receipt.from_expiring, 20);
    assert_eq!(receipt.from_permanent, 10);
    assert_eq!(receipt.remaining, 40);

    // The drained batch is deleted, not kept at zero
    let batches = ledger.list_expiring(user_id).await.unwrap();
    assert!(batches.is_empty());

    let balance = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(balance.permanent, 40);
    assert_eq!(balance.expiring, 0);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_failed_spend_deducts_nothing() {
    let db = setup_test_db().await;
    let ledger = LedgerService::new(db);
    let user_id = Uuid::new_v4();

    ledger.add_permanent(user_id, 10).await.unwrap();
    ledger
        .add_expiring(
            user_id,
            5,
            time::OffsetDateTime::now_utc() + time::Duration::days(1),
        )
        .await
        .unwrap();

    let err = ledger.spend(user_id, 100).await.unwrap_err();
    match err {
        ApiError::InsufficientCredits { needed, available } => {
            assert_eq!(needed, 85);
            assert_eq!(available, 15);
        }
        other => panic!("Expected InsufficientCredits, got: {}", other),
    }

    // Balance unchanged after the failed attempt
    let balance = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(balance.permanent, 10);
    assert_eq!(balance.expiring, 5);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_expired_credits_are_not_spendable() {
    let db = setup_test_db().await;
    let ledger = LedgerService::new(db);
    let user_id = Uuid::new_v4();

    ledger.add_permanent(user_id, 10).await.unwrap();
    ledger
        .add_expiring(
            user_id,
            50,
            time::OffsetDateTime::now_utc() - time::Duration::minutes(5),
        )
        .await
        .unwrap();

    // 50 expired credits must not count toward the spend
    let err = ledger.spend(user_id, 20).await.unwrap_err();
    match err {
        ApiError::InsufficientCredits { needed, available } => {
            assert_eq!(needed, 10);
            assert_eq!(available, 10);
        }
        other => panic!("Expected InsufficientCredits, got: {}", other),
    }
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_spend_exact_total_empties_ledger() {
    let db = setup_test_db().await;
    let ledger = LedgerService::new(db);
    let user_id = Uuid::new_v4();

    ledger.add_permanent(user_id, 7).await.unwrap();
    ledger
        .add_expiring(
            user_id,
            3,
            time::OffsetDateTime::now_utc() + time::Duration::days(1),
        )
        .await
        .unwrap();

    let receipt = ledger.spend(user_id, 10).await.unwrap();
    assert_eq!(receipt.remaining, 0);

    let balance = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(balance.total, 0);
}
