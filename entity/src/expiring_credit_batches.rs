//! `SeaORM` Entity for expiring credit batches

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A bounded-lifetime credit grant. Consumed before permanent credits,
/// soonest expiry first. `amount` stays positive; a batch drained to zero
/// is deleted, never retained.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expiring_credit_batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i32,
    pub expires_at: TimeDateTimeWithTimeZone,
    pub created_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
