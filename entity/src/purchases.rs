//! `SeaORM` Entity for purchase records

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per provider transaction. The provider-issued transaction id is
/// the natural key; the row is inserted once and only ever transitioned in
/// place by the purchase processor or the restoration service.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub transaction_id: String,
    pub user_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub product_id: String,
    pub purchase_date: TimeDateTimeWithTimeZone,
    /// Price in minor units as reported by the provider; absent for rows
    /// created by restoration, where the owned-products list carries no price.
    pub price_cents: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub currency: Option<String>,
    /// "pending" | "completed" | "failed"
    #[sea_orm(column_type = "Text")]
    pub status: String,
    pub processed_at: Option<TimeDateTimeWithTimeZone>,
    pub restored: bool,
    /// "none" | "granted" | "failed"
    #[sea_orm(column_type = "Text")]
    pub credit_status: String,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
