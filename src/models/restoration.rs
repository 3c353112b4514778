use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::SuccessResponse;

/// One entry of the provider's owned-products list
#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OwnedProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub product_id: String,

    /// Provider-issued stable transaction id. Items without one are reported
    /// as per-item errors, never credited against a synthesized id.
    #[validate(length(min = 1, max = 255))]
    pub transaction_id: Option<String>,

    #[serde(with = "time::serde::rfc3339")]
    pub purchase_date: time::OffsetDateTime,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    #[validate(length(min = 1, max = 100), nested)]
    pub owned: Vec<OwnedProductRequest>,
}

pub type RestoreResponse = SuccessResponse<RestoreData>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreData {
    /// Externally-observable credits added: the balance delta across the
    /// pass, not the sum of per-product grants.
    pub restored_credits: i32,
    pub restored_count: i32,
    pub skipped: i32,
    pub errors: i32,
    pub details: Vec<RestoreDetailData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreDetailData {
    pub product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// "restored", "skipped:<reason>", or "error"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Support-path restore for a single purchase; overrides the freshness window
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManualRestoreRequest {
    #[validate(length(min = 1, max = 100))]
    pub product_id: String,

    #[validate(length(min = 1, max = 255))]
    pub transaction_id: String,

    #[serde(with = "time::serde::rfc3339")]
    pub purchase_date: time::OffsetDateTime,
}

pub type ManualRestoreResponse = SuccessResponse<ManualRestoreData>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualRestoreData {
    pub credited: i32,
    pub already_restored: bool,
}

pub type RestorationStatsResponse = SuccessResponse<RestorationStatsData>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorationStatsData {
    pub total_restorations: u64,
    pub successful_restorations: u64,
    pub total_credits_restored: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_restoration_date: Option<time::OffsetDateTime>,
}
