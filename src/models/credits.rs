use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::SuccessResponse;

/// Request to debit credits before a paid action (OCR scan, AI generation)
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpendRequest {
    #[validate(range(min = 1, message = "amount must be a positive integer"))]
    pub amount: i32,
}

pub type SpendResponse = SuccessResponse<SpendData>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendData {
    pub spent: i32,
    pub from_expiring: i32,
    pub from_permanent: i32,
    pub remaining: i32,
}

pub type BalanceResponse = SuccessResponse<BalanceData>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceData {
    pub permanent: i32,
    pub expiring: i32,
    pub total: i32,
}
