use crate::{
    error::{ApiError, Result},
    models::{common::RestorationReason, plans::PlanCreditTable},
    services::{
        ledger_service::LedgerService,
        purchase_service::{GrantResult, PurchaseService},
    },
};
use sea_orm::{entity::*, query::*, DatabaseConnection, PaginatorTrait};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Reconciles the ledger against the provider's canonical owned-products
/// list: re-grants credits for purchases that were never successfully
/// processed, without double-granting ones that were. Safe to retry; a crash
/// mid-pass cannot double-count.
pub struct RestorationService {
    db: DatabaseConnection,
    ledger: LedgerService,
    purchases: PurchaseService,
    plans: PlanCreditTable,
    freshness_window: time::Duration,
}

/// One entry from the provider's owned-products list
#[derive(Debug, Clone)]
pub struct OwnedPurchase {
    pub product_id: String,
    pub transaction_id: Option<String>,
    pub purchase_date: time::OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoCreditProduct,
    StalePurchase,
    AlreadyRestored,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoCreditProduct => "no_credit_product",
            Self::StalePurchase => "stale_purchase",
            Self::AlreadyRestored => "already_restored",
        }
    }
}

#[derive(Debug, Clone)]
pub enum RestoreItemStatus {
    Restored { credits: i32 },
    Skipped { reason: SkipReason },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct RestoreItemOutcome {
    pub product_id: String,
    pub transaction_id: Option<String>,
    pub status: RestoreItemStatus,
}

#[derive(Debug, Clone)]
pub struct RestorationSummary {
    /// Balance delta across the pass; the externally-observable number of
    /// credits actually restored.
    pub restored_credits: i32,
    pub restored_count: i32,
    pub skipped: i32,
    pub errors: i32,
    pub details: Vec<RestoreItemOutcome>,
}

#[derive(Debug, Clone)]
pub struct ManualRestoreOutcome {
    pub credited: i32,
    pub already_restored: bool,
}

#[derive(Debug, Clone)]
pub struct RestorationStats {
    pub total_restorations: u64,
    pub successful_restorations: u64,
    pub total_credits_restored: i64,
    pub last_restoration_date: Option<time::OffsetDateTime>,
}

/// Automatic re-crediting is bounded: purchases older than the window are
/// left to the manual path, where crediting state can be checked by a human.
fn is_within_freshness_window(
    purchase_date: time::OffsetDateTime,
    now: time::OffsetDateTime,
    window: time::Duration,
) -> bool {
    now - purchase_date <= window
}

impl RestorationService {
    pub fn new(
        db: DatabaseConnection,
        plans: PlanCreditTable,
        freshness_window_hours: i64,
    ) -> Self {
        let ledger = LedgerService::new(db.clone());
        let purchases = PurchaseService::new(db.clone(), plans.clone());
        Self {
            db,
            ledger,
            purchases,
            plans,
            freshness_window: time::Duration::hours(freshness_window_hours),
        }
    }

    /// Idempotency guard used before re-granting: has this transaction been
    /// credited through any path already?
    #[instrument(skip(self))]
    pub async fn is_transaction_restored(&self, transaction_id: &str) -> Result<bool> {
        self.purchases.is_credited(transaction_id).await
    }

    /// Walk the owned-products list and re-grant whatever was never
    /// credited. Per-product failures are reported, never propagated, so one
    /// bad entry cannot block the rest.
    #[instrument(skip(self, owned))]
    pub async fn verify_and_restore(
        &self,
        user_id: Uuid,
        owned: &[OwnedPurchase],
    ) -> Result<RestorationSummary> {
        let now = time::OffsetDateTime::now_utc();
        let before = self.ledger.get_balance(user_id).await?.total;

        let mut details = Vec::with_capacity(owned.len());
        for item in owned {
            details.push(self.restore_item(user_id, item, now).await);
        }

        let after = self.ledger.get_balance(user_id).await?.total;

        let mut summary = RestorationSummary {
            restored_credits: after - before,
            restored_count: 0,
            skipped: 0,
            errors: 0,
            details,
        };
        for detail in &summary.details {
            match detail.status {
                RestoreItemStatus::Restored { .. } => summary.restored_count += 1,
                RestoreItemStatus::Skipped { .. } => summary.skipped += 1,
                RestoreItemStatus::Error { .. } => summary.errors += 1,
            }
        }

        info!(
            user_id = %user_id,
            restored_credits = summary.restored_credits,
            restored = summary.restored_count,
            skipped = summary.skipped,
            errors = summary.errors,
            "Completed verification pass"
        );

        Ok(summary)
    }

    async fn restore_item(
        &self,
        user_id: Uuid,
        item: &OwnedPurchase,
        now: time::OffsetDateTime,
    ) -> RestoreItemOutcome {
        let outcome = |status| RestoreItemOutcome {
            product_id: item.product_id.clone(),
            transaction_id: item.transaction_id.clone(),
            status,
        };

        let Some(plan) = self.plans.crediting_plan(&item.product_id) else {
            return outcome(RestoreItemStatus::Skipped {
                reason: SkipReason::NoCreditProduct,
            });
        };

        if !is_within_freshness_window(item.purchase_date, now, self.freshness_window) {
            return outcome(RestoreItemStatus::Skipped {
                reason: SkipReason::StalePurchase,
            });
        }

        // Stable provider ids are required; crediting against an id
        // synthesized from timestamp+product can collide or diverge between
        // runs.
        let Some(transaction_id) = item.transaction_id.as_deref() else {
            return outcome(RestoreItemStatus::Error {
                message: "owned purchase carries no provider transaction id".to_string(),
            });
        };

        match self.is_transaction_restored(transaction_id).await {
            Ok(true) => {
                return outcome(RestoreItemStatus::Skipped {
                    reason: SkipReason::AlreadyRestored,
                });
            }
            Ok(false) => {}
            Err(e) => {
                return outcome(RestoreItemStatus::Error {
                    message: e.to_string(),
                });
            }
        }

        match self
            .purchases
            .grant_for_transaction(
                user_id,
                &item.product_id,
                transaction_id,
                item.purchase_date,
                None,
                None,
                plan,
                RestorationReason::Verification,
                true,
            )
            .await
        {
            Ok(GrantResult::Granted { credits }) => {
                outcome(RestoreItemStatus::Restored { credits })
            }
            Ok(GrantResult::AlreadyCredited) => outcome(RestoreItemStatus::Skipped {
                reason: SkipReason::AlreadyRestored,
            }),
            Err(e) => {
                warn!(
                    transaction_id,
                    error = %e,
                    "Restoration grant failed"
                );
                if matches!(e, ApiError::Database(_) | ApiError::Internal(_)) {
                    self.purchases
                        .mark_credit_failure(
                            user_id,
                            &item.product_id,
                            transaction_id,
                            plan.credits,
                            RestorationReason::Verification,
                        )
                        .await;
                }
                outcome(RestoreItemStatus::Error {
                    message: e.to_string(),
                })
            }
        }
    }

    /// Support-path restore for a single purchase. Overrides the freshness
    /// window; everything else (duplicate guard, audit) works as in the
    /// automatic pass.
    #[instrument(skip(self))]
    pub async fn manual_restore(
        &self,
        user_id: Uuid,
        product_id: &str,
        transaction_id: &str,
        purchase_date: time::OffsetDateTime,
    ) -> Result<ManualRestoreOutcome> {
        let plan = self.plans.crediting_plan(product_id).ok_or_else(|| {
            ApiError::Validation(format!("Product {} grants no credits", product_id))
        })?;

        match self
            .purchases
            .grant_for_transaction(
                user_id,
                product_id,
                transaction_id,
                purchase_date,
                None,
                None,
                plan,
                RestorationReason::ManualRestore,
                true,
            )
            .await?
        {
            GrantResult::Granted { credits } => Ok(ManualRestoreOutcome {
                credited: credits,
                already_restored: false,
            }),
            GrantResult::AlreadyCredited => Ok(ManualRestoreOutcome {
                credited: 0,
                already_restored: true,
            }),
        }
    }

    /// Aggregate restoration history for one user, from the audit log
    #[instrument(skip(self))]
    pub async fn get_restoration_stats(&self, user_id: Uuid) -> Result<RestorationStats> {
        let total_restorations = entity::credit_restorations::Entity::find()
            .filter(entity::credit_restorations::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;

        let successful_restorations = entity::credit_restorations::Entity::find()
            .filter(entity::credit_restorations::Column::UserId.eq(user_id))
            .filter(entity::credit_restorations::Column::Status.eq("success"))
            .count(&self.db)
            .await?;

        let total_credits_restored = entity::credit_restorations::Entity::find()
            .filter(entity::credit_restorations::Column::UserId.eq(user_id))
            .filter(entity::credit_restorations::Column::Status.eq("success"))
            .select_only()
            .column_as(
                entity::credit_restorations::Column::ActualCreditsAdded.sum(),
                "total_credits",
            )
            .into_tuple::<Option<i64>>()
            .one(&self.db)
            .await?
            .flatten()
            .unwrap_or(0);

        let last_restoration_date = entity::credit_restorations::Entity::find()
            .filter(entity::credit_restorations::Column::UserId.eq(user_id))
            .select_only()
            .column_as(
                entity::credit_restorations::Column::CreatedAt.max(),
                "last_restoration",
            )
            .into_tuple::<Option<time::OffsetDateTime>>()
            .one(&self.db)
            .await?
            .flatten();

        Ok(RestorationStats {
            total_restorations,
            successful_restorations,
            total_credits_restored,
            last_restoration_date,
        })
    }
}
