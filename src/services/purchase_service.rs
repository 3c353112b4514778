use crate::{
    error::{ApiError, Result},
    models::{
        common::{CreditStatus, PurchaseStatus, RestorationReason, RestorationStatus},
        plans::{PlanCredit, PlanCreditTable},
    },
    services::ledger_service::LedgerService,
};
use anyhow::anyhow;
use sea_orm::{
    entity::*, query::*, sea_query::OnConflict, DatabaseConnection, DbErr, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Records purchase events immutably and turns completed purchases into
/// credit grants exactly once per provider transaction id.
pub struct PurchaseService {
    db: DatabaseConnection,
    ledger: LedgerService,
    plans: PlanCreditTable,
}

/// One transaction out of a provider receipt
#[derive(Debug, Clone)]
pub struct ReceiptTransaction {
    pub transaction_id: String,
    pub purchase_date: time::OffsetDateTime,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    Granted,
    AlreadyProcessed,
    NoCredit,
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub transaction_id: String,
    pub credited: i32,
    pub status: ProcessStatus,
}

#[derive(Debug, Clone)]
pub struct FailedTransaction {
    pub transaction_id: String,
    pub message: String,
}

/// Aggregated result of processing a multi-transaction receipt. A failure on
/// one transaction never rolls back or blocks its siblings.
#[derive(Debug, Clone, Default)]
pub struct ReceiptOutcome {
    pub total_credited: i32,
    pub processed: i32,
    pub already_processed: i32,
    pub skipped: i32,
    pub failed: Vec<FailedTransaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GrantResult {
    Granted { credits: i32 },
    AlreadyCredited,
}

impl PurchaseService {
    pub fn new(db: DatabaseConnection, plans: PlanCreditTable) -> Self {
        let ledger = LedgerService::new(db.clone());
        Self { db, ledger, plans }
    }

    /// Record a purchase event. Inserts a new record if the transaction id is
    /// unseen; an existing record is authoritative and the call is a no-op.
    #[instrument(skip(self))]
    #[allow(clippy::too_many_arguments)]
    pub async fn record_purchase(
        &self,
        user_id: Uuid,
        product_id: &str,
        transaction_id: &str,
        purchase_date: time::OffsetDateTime,
        price_cents: Option<i64>,
        currency: Option<&str>,
        status: PurchaseStatus,
    ) -> Result<bool> {
        if transaction_id.trim().is_empty() {
            return Err(ApiError::Validation(
                "transaction id must not be empty".to_string(),
            ));
        }

        let now = time::OffsetDateTime::now_utc();
        let new_purchase = entity::purchases::ActiveModel {
            transaction_id: Set(transaction_id.to_string()),
            user_id: Set(user_id),
            product_id: Set(product_id.to_string()),
            purchase_date: Set(purchase_date),
            price_cents: Set(price_cents),
            currency: Set(currency.map(|c| c.to_string())),
            status: Set(status.as_str().to_string()),
            processed_at: Set(None),
            restored: Set(false),
            credit_status: Set(CreditStatus::None.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = match entity::purchases::Entity::insert(new_purchase)
            .on_conflict(
                OnConflict::column(entity::purchases::Column::TransactionId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&self.db)
            .await
        {
            Ok(_) => true,
            Err(DbErr::RecordNotInserted) => false,
            Err(e) => return Err(e.into()),
        };

        if inserted {
            info!(
                user_id = %user_id,
                transaction_id,
                product_id,
                "Recorded purchase"
            );
        } else {
            info!(transaction_id, "Purchase already on record, ignoring");
        }

        Ok(inserted)
    }

    /// True iff the purchase completed and its crediting already happened
    #[instrument(skip(self))]
    pub async fn is_processed(&self, transaction_id: &str) -> Result<bool> {
        let purchase = entity::purchases::Entity::find_by_id(transaction_id.to_string())
            .one(&self.db)
            .await?;

        Ok(purchase
            .map(|p| {
                p.status == PurchaseStatus::Completed.as_str()
                    && p.credit_status == CreditStatus::Granted.as_str()
            })
            .unwrap_or(false))
    }

    /// True if the transaction has been credited through any path (initial
    /// processing or restoration)
    pub(crate) async fn is_credited(&self, transaction_id: &str) -> Result<bool> {
        let purchase = entity::purchases::Entity::find_by_id(transaction_id.to_string())
            .one(&self.db)
            .await?;

        Ok(purchase.map(|p| Self::already_credited(&p)).unwrap_or(false))
    }

    fn already_credited(purchase: &entity::purchases::Model) -> bool {
        purchase.credit_status == CreditStatus::Granted.as_str()
            || purchase.restored
            || purchase.processed_at.is_some()
    }

    /// Turn one completed purchase into a credit grant, exactly once.
    #[instrument(skip(self))]
    pub async fn process_purchase(
        &self,
        user_id: Uuid,
        product_id: &str,
        transaction_id: &str,
        purchase_date: time::OffsetDateTime,
        price_cents: Option<i64>,
        currency: Option<&str>,
    ) -> Result<ProcessOutcome> {
        // Not every product grants credits; record-only products are fine.
        let Some(plan) = self.plans.crediting_plan(product_id) else {
            info!(product_id, transaction_id, "Product grants no credits");
            return Ok(ProcessOutcome {
                transaction_id: transaction_id.to_string(),
                credited: 0,
                status: ProcessStatus::NoCredit,
            });
        };

        // Fast path; re-checked under row lock inside the grant transaction.
        if self.is_credited(transaction_id).await? {
            info!(transaction_id, "Purchase already processed");
            return Ok(ProcessOutcome {
                transaction_id: transaction_id.to_string(),
                credited: 0,
                status: ProcessStatus::AlreadyProcessed,
            });
        }

        match self
            .grant_for_transaction(
                user_id,
                product_id,
                transaction_id,
                purchase_date,
                price_cents,
                currency,
                plan,
                RestorationReason::InitialPurchase,
                false,
            )
            .await
        {
            Ok(GrantResult::Granted { credits }) => Ok(ProcessOutcome {
                transaction_id: transaction_id.to_string(),
                credited: credits,
                status: ProcessStatus::Granted,
            }),
            Ok(GrantResult::AlreadyCredited) => Ok(ProcessOutcome {
                transaction_id: transaction_id.to_string(),
                credited: 0,
                status: ProcessStatus::AlreadyProcessed,
            }),
            Err(e) => {
                // The grant transaction rolled back; leave a failure mark so
                // a later restoration pass can repair this purchase. No
                // inline retry here.
                if matches!(e, ApiError::Database(_) | ApiError::Internal(_)) {
                    self.mark_credit_failure(
                        user_id,
                        product_id,
                        transaction_id,
                        plan.credits,
                        RestorationReason::InitialPurchase,
                    )
                    .await;
                }
                Err(e)
            }
        }
    }

    /// Process every transaction bundled in one provider receipt
    /// independently and aggregate the results.
    #[instrument(skip(self, transactions))]
    pub async fn process_receipt(
        &self,
        user_id: Uuid,
        product_id: &str,
        transactions: &[ReceiptTransaction],
    ) -> Result<ReceiptOutcome> {
        let mut outcome = ReceiptOutcome::default();

        for tx in transactions {
            match self
                .process_purchase(
                    user_id,
                    product_id,
                    &tx.transaction_id,
                    tx.purchase_date,
                    tx.price_cents,
                    tx.currency.as_deref(),
                )
                .await
            {
                Ok(processed) => match processed.status {
                    ProcessStatus::Granted => {
                        outcome.total_credited += processed.credited;
                        outcome.processed += 1;
                    }
                    ProcessStatus::AlreadyProcessed => outcome.already_processed += 1,
                    ProcessStatus::NoCredit => outcome.skipped += 1,
                },
                Err(e) => {
                    warn!(
                        transaction_id = %tx.transaction_id,
                        error = %e,
                        "Failed to process receipt transaction"
                    );
                    outcome.failed.push(FailedTransaction {
                        transaction_id: tx.transaction_id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            user_id = %user_id,
            product_id,
            total_credited = outcome.total_credited,
            processed = outcome.processed,
            already_processed = outcome.already_processed,
            failed = outcome.failed.len(),
            "Processed purchase receipt"
        );

        Ok(outcome)
    }

    /// Grant credits for one transaction atomically: upsert the purchase
    /// row, re-check the duplicate guard under a row lock, write the batch,
    /// transition the purchase, and append the audit record — one
    /// transaction, all or nothing.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn grant_for_transaction(
        &self,
        user_id: Uuid,
        product_id: &str,
        transaction_id: &str,
        purchase_date: time::OffsetDateTime,
        price_cents: Option<i64>,
        currency: Option<&str>,
        plan: PlanCredit,
        reason: RestorationReason,
        mark_restored: bool,
    ) -> Result<GrantResult> {
        let txn = self.db.begin().await?;
        let now = time::OffsetDateTime::now_utc();

        let new_purchase = entity::purchases::ActiveModel {
            transaction_id: Set(transaction_id.to_string()),
            user_id: Set(user_id),
            product_id: Set(product_id.to_string()),
            purchase_date: Set(purchase_date),
            price_cents: Set(price_cents),
            currency: Set(currency.map(|c| c.to_string())),
            status: Set(PurchaseStatus::Pending.as_str().to_string()),
            processed_at: Set(None),
            restored: Set(false),
            credit_status: Set(CreditStatus::None.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match entity::purchases::Entity::insert(new_purchase)
            .on_conflict(
                OnConflict::column(entity::purchases::Column::TransactionId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&txn)
            .await
        {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e.into()),
        }

        let purchase = entity::purchases::Entity::find_by_id(transaction_id.to_string())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow!(
                    "Failed to read purchase after insert for transaction {}",
                    transaction_id
                ))
            })?;

        // The duplicate-suppression guarantee: at most one successful
        // crediting per transaction id.
        if Self::already_credited(&purchase) {
            txn.rollback().await?;
            return Ok(GrantResult::AlreadyCredited);
        }

        if purchase.user_id != user_id {
            txn.rollback().await?;
            return Err(ApiError::Validation(format!(
                "Transaction {} belongs to another user",
                transaction_id
            )));
        }

        let expires_at = now + time::Duration::days(plan.validity_days);
        self.ledger
            .add_expiring_txn(user_id, plan.credits, expires_at, &txn)
            .await?;

        let mut purchase_active: entity::purchases::ActiveModel = purchase.into();
        purchase_active.status = Set(PurchaseStatus::Completed.as_str().to_string());
        purchase_active.processed_at = Set(Some(now));
        purchase_active.credit_status = Set(CreditStatus::Granted.as_str().to_string());
        if mark_restored {
            purchase_active.restored = Set(true);
        }
        purchase_active.updated_at = Set(now);
        purchase_active.update(&txn).await?;

        let audit = entity::credit_restorations::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id.to_string()),
            transaction_id: Set(transaction_id.to_string()),
            expected_credits: Set(plan.credits),
            actual_credits_added: Set(plan.credits),
            reason: Set(reason.as_str().to_string()),
            status: Set(RestorationStatus::Success.as_str().to_string()),
            created_at: Set(now),
        };
        audit.insert(&txn).await?;

        txn.commit().await?;

        info!(
            user_id = %user_id,
            transaction_id,
            product_id,
            credits = plan.credits,
            expires_at = %expires_at,
            reason = reason.as_str(),
            "Granted credits for transaction"
        );

        Ok(GrantResult::Granted {
            credits: plan.credits,
        })
    }

    /// Best-effort failure mark after a rolled-back grant. The purchase row
    /// (if any) is flagged and a failed audit record appended so support and
    /// the restoration pass can find it.
    pub(crate) async fn mark_credit_failure(
        &self,
        user_id: Uuid,
        product_id: &str,
        transaction_id: &str,
        expected_credits: i32,
        reason: RestorationReason,
    ) {
        let result = self
            .mark_credit_failure_inner(user_id, product_id, transaction_id, expected_credits, reason)
            .await;
        if let Err(e) = result {
            warn!(
                transaction_id,
                error = %e,
                "Could not record crediting failure"
            );
        }
    }

    async fn mark_credit_failure_inner(
        &self,
        user_id: Uuid,
        product_id: &str,
        transaction_id: &str,
        expected_credits: i32,
        reason: RestorationReason,
    ) -> Result<()> {
        let txn = self.db.begin().await?;
        let now = time::OffsetDateTime::now_utc();

        if let Some(purchase) = entity::purchases::Entity::find_by_id(transaction_id.to_string())
            .lock_exclusive()
            .one(&txn)
            .await?
        {
            // Never downgrade a successful grant.
            if !Self::already_credited(&purchase) {
                let mut active: entity::purchases::ActiveModel = purchase.into();
                active.credit_status = Set(CreditStatus::Failed.as_str().to_string());
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
        }

        let audit = entity::credit_restorations::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id.to_string()),
            transaction_id: Set(transaction_id.to_string()),
            expected_credits: Set(expected_credits),
            actual_credits_added: Set(0),
            reason: Set(reason.as_str().to_string()),
            status: Set(RestorationStatus::Failed.as_str().to_string()),
            created_at: Set(now),
        };
        audit.insert(&txn).await?;

        txn.commit().await?;
        Ok(())
    }
}
