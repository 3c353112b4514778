use axum::{extract::State, Json};
use tracing::instrument;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    middleware::UserIdentity,
    models::{
        common::{PurchaseStatus, SuccessResponse},
        purchases::{
            FailedTransactionData, ProcessReceiptData, ProcessReceiptRequest,
            ProcessReceiptResponse, RecordPurchaseData, RecordPurchaseRequest,
            RecordPurchaseResponse,
        },
    },
    services::purchase_service::ReceiptTransaction,
};

/// POST /api/v1/purchases
///
/// Records a purchase event as observed by the client. Recording is
/// idempotent per transaction id; processing (crediting) is a separate step.
#[instrument(skip(state, identity, request))]
pub async fn record_purchase(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<RecordPurchaseRequest>,
) -> Result<Json<RecordPurchaseResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(format!("Validation error: {}", e)))?;

    let recorded = state
        .purchase_service
        .record_purchase(
            identity.user_id,
            &request.product_id,
            &request.transaction_id,
            request.purchase_date,
            request.price_cents,
            request.currency.as_deref(),
            request.status.unwrap_or(PurchaseStatus::Completed),
        )
        .await?;

    Ok(Json(SuccessResponse::new(RecordPurchaseData {
        transaction_id: request.transaction_id,
        recorded,
    })))
}

/// POST /api/v1/purchases/process
///
/// Applies a completed receipt to the ledger. Each bundled transaction is
/// credited independently and exactly once; the response aggregates
/// per-transaction outcomes.
#[instrument(skip(state, identity, request))]
pub async fn process_receipt(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<ProcessReceiptRequest>,
) -> Result<Json<ProcessReceiptResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(format!("Validation error: {}", e)))?;

    let transactions: Vec<ReceiptTransaction> = request
        .transactions
        .iter()
        .map(|tx| ReceiptTransaction {
            transaction_id: tx.transaction_id.clone(),
            purchase_date: tx.purchase_date,
            price_cents: tx.price_cents,
            currency: tx.currency.clone(),
        })
        .collect();

    let outcome = state
        .purchase_service
        .process_receipt(identity.user_id, &request.product_id, &transactions)
        .await?;

    Ok(Json(SuccessResponse::new(ProcessReceiptData {
        total_credited: outcome.total_credited,
        processed: outcome.processed,
        already_processed: outcome.already_processed,
        skipped: outcome.skipped,
        failed: outcome
            .failed
            .into_iter()
            .map(|f| FailedTransactionData {
                transaction_id: f.transaction_id,
                message: f.message,
            })
            .collect(),
    })))
}
