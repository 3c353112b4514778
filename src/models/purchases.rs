use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{PurchaseStatus, SuccessResponse};

/// Request to record a purchase event as observed by the client
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordPurchaseRequest {
    #[validate(length(min = 1, max = 255))]
    pub transaction_id: String,

    #[validate(length(min = 1, max = 100))]
    pub product_id: String,

    #[serde(with = "time::serde::rfc3339")]
    pub purchase_date: time::OffsetDateTime,

    #[validate(range(min = 0))]
    pub price_cents: Option<i64>,

    #[validate(length(min = 3, max = 8))]
    pub currency: Option<String>,

    /// Defaults to completed; the provider callback only fires for
    /// finalized transactions.
    pub status: Option<PurchaseStatus>,
}

pub type RecordPurchaseResponse = SuccessResponse<RecordPurchaseData>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPurchaseData {
    pub transaction_id: String,
    /// false when the transaction was already on record and the call was a no-op
    pub recorded: bool,
}

/// One transaction inside a provider receipt
#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptTransactionRequest {
    #[validate(length(min = 1, max = 255))]
    pub transaction_id: String,

    #[serde(with = "time::serde::rfc3339")]
    pub purchase_date: time::OffsetDateTime,

    #[validate(range(min = 0))]
    pub price_cents: Option<i64>,

    #[validate(length(min = 3, max = 8))]
    pub currency: Option<String>,
}

/// A completed receipt for one product. A single receipt may bundle several
/// distinct transactions (repeated restores of the same product); each is
/// credited independently.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProcessReceiptRequest {
    #[validate(length(min = 1, max = 100))]
    pub product_id: String,

    #[validate(
        length(min = 1, message = "receipt must contain at least one transaction"),
        nested
    )]
    pub transactions: Vec<ReceiptTransactionRequest>,
}

pub type ProcessReceiptResponse = SuccessResponse<ProcessReceiptData>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessReceiptData {
    pub total_credited: i32,
    pub processed: i32,
    pub already_processed: i32,
    pub skipped: i32,
    pub failed: Vec<FailedTransactionData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTransactionData {
    pub transaction_id: String,
    pub message: String,
}
