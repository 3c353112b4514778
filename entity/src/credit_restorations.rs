//! `SeaORM` Entity for the restoration audit log

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only audit record of every crediting attempt. Used for reporting
/// and support diagnosis; the `purchases` row is the source of truth for
/// whether a transaction has been credited.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credit_restorations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub product_id: String,
    #[sea_orm(column_type = "Text")]
    pub transaction_id: String,
    pub expected_credits: i32,
    pub actual_credits_added: i32,
    /// "initial_purchase" | "verification" | "manual_restore"
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    /// "success" | "partial" | "failed"
    #[sea_orm(column_type = "Text")]
    pub status: String,
    pub created_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
