use crate::error::{ApiError, Result};
use sea_orm::{
    entity::*, query::*, DatabaseConnection, DatabaseTransaction, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

/// Canonical ledger for one user's spendable credits: a permanent balance
/// plus expiring credit batches. Every read sweeps expired batches first, so
/// expired credits are never visible or spendable. Every read-compute-write
/// sequence runs in one transaction with the touched rows locked.
pub struct LedgerService {
    db: DatabaseConnection,
}

#[derive(Debug, Clone, Copy)]
pub struct BalanceBreakdown {
    pub permanent: i32,
    pub expiring: i32,
    pub total: i32,
}

#[derive(Debug, Clone)]
pub struct SpendReceipt {
    pub spent: i32,
    pub from_expiring: i32,
    pub from_permanent: i32,
    pub remaining: i32,
}

impl LedgerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn ensure_positive(amount: i32) -> Result<()> {
        if amount <= 0 {
            return Err(ApiError::Validation(format!(
                "amount must be a positive integer, got {}",
                amount
            )));
        }
        Ok(())
    }

    /// Current balance, with expired batches swept out first
    #[instrument(skip(self))]
    pub async fn get_balance(&self, user_id: Uuid) -> Result<BalanceBreakdown> {
        let txn = self.db.begin().await?;
        self.sweep_expired_txn(user_id, &txn).await?;
        let breakdown = self.balance_breakdown_txn(user_id, &txn).await?;
        txn.commit().await?;
        Ok(breakdown)
    }

    async fn balance_breakdown_txn(
        &self,
        user_id: Uuid,
        txn: &DatabaseTransaction,
    ) -> Result<BalanceBreakdown> {
        let permanent = entity::credit_balances::Entity::find()
            .filter(entity::credit_balances::Column::UserId.eq(user_id))
            .one(txn)
            .await?
            .map(|balance| balance.permanent_credits)
            .unwrap_or(0);

        let batches = entity::expiring_credit_batches::Entity::find()
            .filter(entity::expiring_credit_batches::Column::UserId.eq(user_id))
            .all(txn)
            .await?;
        let expiring: i32 = batches.iter().map(|batch| batch.amount).sum();

        Ok(BalanceBreakdown {
            permanent,
            expiring,
            total: permanent + expiring,
        })
    }

    /// Delete every batch whose expiry is strictly in the past. Idempotent.
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self, user_id: Uuid) -> Result<u64> {
        let txn = self.db.begin().await?;
        let swept = self.sweep_expired_txn(user_id, &txn).await?;
        txn.commit().await?;
        Ok(swept)
    }

    pub(crate) async fn sweep_expired_txn(
        &self,
        user_id: Uuid,
        txn: &DatabaseTransaction,
    ) -> Result<u64> {
        let now = time::OffsetDateTime::now_utc();
        let result = entity::expiring_credit_batches::Entity::delete_many()
            .filter(entity::expiring_credit_batches::Column::UserId.eq(user_id))
            .filter(entity::expiring_credit_batches::Column::ExpiresAt.lt(now))
            .exec(txn)
            .await?;

        if result.rows_affected > 0 {
            info!(
                user_id = %user_id,
                swept = result.rows_affected,
                "Swept expired credit batches"
            );
        }

        Ok(result.rows_affected)
    }

    /// Grant permanent (non-expiring) credits. Creates the balance row on
    /// first grant.
    #[instrument(skip(self))]
    pub async fn add_permanent(&self, user_id: Uuid, amount: i32) -> Result<i32> {
        Self::ensure_positive(amount)?;

        let txn = self.db.begin().await?;
        let now = time::OffsetDateTime::now_utc();

        let existing = entity::credit_balances::Entity::find()
            .filter(entity::credit_balances::Column::UserId.eq(user_id))
            .lock_exclusive()
            .one(&txn)
            .await?;

        let new_permanent = match existing {
            Some(balance) => {
                let updated = balance.permanent_credits + amount;
                let mut active: entity::credit_balances::ActiveModel = balance.into();
                active.permanent_credits = Set(updated);
                active.last_updated = Set(now);
                active.update(&txn).await?;
                updated
            }
            None => {
                let active = entity::credit_balances::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    permanent_credits: Set(amount),
                    last_updated: Set(now),
                    created_at: Set(now),
                };
                active.insert(&txn).await?;
                amount
            }
        };

        txn.commit().await?;

        info!(
            user_id = %user_id,
            amount,
            permanent = new_permanent,
            "Granted permanent credits"
        );

        Ok(new_permanent)
    }

    /// Grant a batch of expiring credits
    #[instrument(skip(self))]
    pub async fn add_expiring(
        &self,
        user_id: Uuid,
        amount: i32,
        expires_at: time::OffsetDateTime,
    ) -> Result<Uuid> {
        let txn = self.db.begin().await?;
        let batch_id = self.add_expiring_txn(user_id, amount, expires_at, &txn).await?;
        txn.commit().await?;
        Ok(batch_id)
    }

    /// Grant a batch of expiring credits within an existing transaction.
    /// Used by the purchase processor to make grant + record-keeping atomic.
    pub(crate) async fn add_expiring_txn(
        &self,
        user_id: Uuid,
        amount: i32,
        expires_at: time::OffsetDateTime,
        txn: &DatabaseTransaction,
    ) -> Result<Uuid> {
        Self::ensure_positive(amount)?;

        let batch_id = Uuid::new_v4();
        let active = entity::expiring_credit_batches::ActiveModel {
            id: Set(batch_id),
            user_id: Set(user_id),
            amount: Set(amount),
            expires_at: Set(expires_at),
            created_at: Set(time::OffsetDateTime::now_utc()),
        };
        active.insert(txn).await?;

        info!(
            user_id = %user_id,
            amount,
            expires_at = %expires_at,
            "Granted expiring credit batch"
        );

        Ok(batch_id)
    }

    /// Live (unexpired) batches, soonest expiry first
    #[instrument(skip(self))]
    pub async fn list_expiring(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<entity::expiring_credit_batches::Model>> {
        let txn = self.db.begin().await?;
        self.sweep_expired_txn(user_id, &txn).await?;
        let batches = entity::expiring_credit_batches::Entity::find()
            .filter(entity::expiring_credit_batches::Column::UserId.eq(user_id))
            .order_by_asc(entity::expiring_credit_batches::Column::ExpiresAt)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(batches)
    }

    /// Set a batch to a new remaining amount. A batch adjusted to zero is
    /// deleted, never retained; negative amounts are rejected.
    #[instrument(skip(self))]
    pub async fn adjust_expiring(&self, batch_id: Uuid, new_amount: i32) -> Result<()> {
        if new_amount < 0 {
            return Err(ApiError::Validation(format!(
                "batch amount must not be negative, got {}",
                new_amount
            )));
        }

        let txn = self.db.begin().await?;

        let batch = entity::expiring_credit_batches::Entity::find_by_id(batch_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Credit batch {} not found", batch_id)))?;

        if new_amount == 0 {
            entity::expiring_credit_batches::Entity::delete_by_id(batch.id)
                .exec(&txn)
                .await?;
        } else {
            let mut active: entity::expiring_credit_batches::ActiveModel = batch.into();
            active.amount = Set(new_amount);
            active.update(&txn).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Debit the permanent balance only; fails without deducting if the
    /// balance cannot cover the amount.
    #[instrument(skip(self))]
    pub async fn deduct_permanent(&self, user_id: Uuid, amount: i32) -> Result<i32> {
        Self::ensure_positive(amount)?;

        let txn = self.db.begin().await?;

        let balance = entity::credit_balances::Entity::find()
            .filter(entity::credit_balances::Column::UserId.eq(user_id))
            .lock_exclusive()
            .one(&txn)
            .await?;

        let available = balance.as_ref().map(|b| b.permanent_credits).unwrap_or(0);
        if available < amount {
            txn.rollback().await?;
            return Err(ApiError::InsufficientCredits {
                needed: amount - available,
                available,
            });
        }

        let balance = balance.ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!(
                "Balance row missing for user {} with available credits",
                user_id
            ))
        })?;
        let remaining = balance.permanent_credits - amount;
        let mut active: entity::credit_balances::ActiveModel = balance.into();
        active.permanent_credits = Set(remaining);
        active.last_updated = Set(time::OffsetDateTime::now_utc());
        active.update(&txn).await?;

        txn.commit().await?;

        Ok(remaining)
    }

    /// Atomically debit credits: expiring batches first, soonest expiry
    /// first, then the permanent balance. All-or-nothing; a shortfall leaves
    /// the ledger untouched and reports how much is still needed.
    #[instrument(skip(self))]
    pub async fn spend(&self, user_id: Uuid, amount: i32) -> Result<SpendReceipt> {
        Self::ensure_positive(amount)?;

        let txn = self.db.begin().await?;
        self.sweep_expired_txn(user_id, &txn).await?;

        // Lock order: balance row, then batches. Concurrent spends for the
        // same user serialize on these locks.
        let balance = entity::credit_balances::Entity::find()
            .filter(entity::credit_balances::Column::UserId.eq(user_id))
            .lock_exclusive()
            .one(&txn)
            .await?;
        let permanent = balance.as_ref().map(|b| b.permanent_credits).unwrap_or(0);

        let batches = entity::expiring_credit_batches::Entity::find()
            .filter(entity::expiring_credit_batches::Column::UserId.eq(user_id))
            .order_by_asc(entity::expiring_credit_batches::Column::ExpiresAt)
            .lock_exclusive()
            .all(&txn)
            .await?;

        let amounts: Vec<(Uuid, i32)> = batches.iter().map(|b| (b.id, b.amount)).collect();
        let plan = match allocate_spend(&amounts, permanent, amount) {
            Ok(plan) => plan,
            Err(shortfall) => {
                let available = amount - shortfall;
                txn.rollback().await?;
                return Err(ApiError::InsufficientCredits {
                    needed: shortfall,
                    available,
                });
            }
        };

        // Draws line up with the loaded batches: the allocation walks them
        // in the same order and stops once the amount is satisfied.
        for (draw, batch) in plan.draws.iter().zip(batches.iter()) {
            if draw.remaining == 0 {
                entity::expiring_credit_batches::Entity::delete_by_id(draw.batch_id)
                    .exec(&txn)
                    .await?;
            } else {
                let mut active: entity::expiring_credit_batches::ActiveModel =
                    batch.clone().into();
                active.amount = Set(draw.remaining);
                active.update(&txn).await?;
            }
        }

        if plan.from_permanent > 0 {
            let balance = balance.ok_or_else(|| {
                ApiError::Internal(anyhow::anyhow!(
                    "Balance row missing for user {} during permanent draw",
                    user_id
                ))
            })?;
            let remaining = balance.permanent_credits - plan.from_permanent;
            let mut active: entity::credit_balances::ActiveModel = balance.into();
            active.permanent_credits = Set(remaining);
            active.last_updated = Set(time::OffsetDateTime::now_utc());
            active.update(&txn).await?;
        }

        txn.commit().await?;

        let from_expiring: i32 = plan.draws.iter().map(|d| d.drawn).sum();
        let expiring_total: i32 = amounts.iter().map(|(_, a)| a).sum();
        let remaining = permanent + expiring_total - amount;

        info!(
            user_id = %user_id,
            amount,
            from_expiring,
            from_permanent = plan.from_permanent,
            remaining,
            "Spent credits"
        );

        Ok(SpendReceipt {
            spent: amount,
            from_expiring,
            from_permanent: plan.from_permanent,
            remaining,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BatchDraw {
    pub batch_id: Uuid,
    pub drawn: i32,
    pub remaining: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SpendPlan {
    pub draws: Vec<BatchDraw>,
    pub from_permanent: i32,
}

/// Pure allocation of a spend across batches (in the given order) and the
/// permanent balance. Returns the shortfall when the total cannot cover the
/// amount; the caller rolls back so nothing is partially deducted.
pub(crate) fn allocate_spend(
    batches: &[(Uuid, i32)],
    permanent: i32,
    amount: i32,
) -> std::result::Result<SpendPlan, i32> {
    let expiring_total: i32 = batches.iter().map(|(_, available)| available).sum();
    if expiring_total + permanent < amount {
        return Err(amount - expiring_total - permanent);
    }

    let mut left = amount;
    let mut draws = Vec::new();
    for &(batch_id, available) in batches {
        if left == 0 {
            break;
        }
        let drawn = left.min(available);
        draws.push(BatchDraw {
            batch_id,
            drawn,
            remaining: available - drawn,
        });
        left -= drawn;
    }

    Ok(SpendPlan {
        draws,
        from_permanent: left,
    })
}
