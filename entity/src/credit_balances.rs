//! `SeaORM` Entity for per-user credit balances

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per user; holds the permanent (non-expiring) credit balance.
/// Created lazily on the first grant.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credit_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub permanent_credits: i32,
    pub last_updated: TimeDateTimeWithTimeZone,
    pub created_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
