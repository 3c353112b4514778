use axum::{extract::State, Json};
use tracing::instrument;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    middleware::UserIdentity,
    models::{
        common::SuccessResponse,
        restoration::{
            ManualRestoreData, ManualRestoreRequest, ManualRestoreResponse, RestorationStatsData,
            RestorationStatsResponse, RestoreData, RestoreDetailData, RestoreRequest,
            RestoreResponse,
        },
    },
    services::restoration_service::{OwnedPurchase, RestoreItemStatus},
};

/// POST /api/v1/restore
///
/// Reconciles the ledger against the provider's owned-products list. Safe to
/// retry: already-credited transactions are skipped and the reported credits
/// are the balance delta of this pass.
#[instrument(skip(state, identity, request))]
pub async fn verify_and_restore(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<RestoreRequest>,
) -> Result<Json<RestoreResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(format!("Validation error: {}", e)))?;

    let owned: Vec<OwnedPurchase> = request
        .owned
        .iter()
        .map(|item| OwnedPurchase {
            product_id: item.product_id.clone(),
            transaction_id: item.transaction_id.clone(),
            purchase_date: item.purchase_date,
        })
        .collect();

    let summary = state
        .restoration_service
        .verify_and_restore(identity.user_id, &owned)
        .await?;

    let details = summary
        .details
        .into_iter()
        .map(|detail| {
            let (status, credits, message) = match detail.status {
                RestoreItemStatus::Restored { credits } => {
                    ("restored".to_string(), Some(credits), None)
                }
                RestoreItemStatus::Skipped { reason } => {
                    (format!("skipped:{}", reason.as_str()), None, None)
                }
                RestoreItemStatus::Error { message } => {
                    ("error".to_string(), None, Some(message))
                }
            };
            RestoreDetailData {
                product_id: detail.product_id,
                transaction_id: detail.transaction_id,
                status,
                credits,
                message,
            }
        })
        .collect();

    Ok(Json(SuccessResponse::new(RestoreData {
        restored_credits: summary.restored_credits,
        restored_count: summary.restored_count,
        skipped: summary.skipped,
        errors: summary.errors,
        details,
    })))
}

/// POST /api/v1/restore/manual
///
/// Support path: restores a single purchase regardless of its age. The
/// duplicate guard still applies.
#[instrument(skip(state, identity, request))]
pub async fn manual_restore(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<ManualRestoreRequest>,
) -> Result<Json<ManualRestoreResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(format!("Validation error: {}", e)))?;

    let outcome = state
        .restoration_service
        .manual_restore(
            identity.user_id,
            &request.product_id,
            &request.transaction_id,
            request.purchase_date,
        )
        .await?;

    Ok(Json(SuccessResponse::new(ManualRestoreData {
        credited: outcome.credited,
        already_restored: outcome.already_restored,
    })))
}

/// GET /api/v1/restore/stats
#[instrument(skip(state, identity))]
pub async fn get_restoration_stats(
    State(state): State<AppState>,
    identity: UserIdentity,
) -> Result<Json<RestorationStatsResponse>> {
    let stats = state
        .restoration_service
        .get_restoration_stats(identity.user_id)
        .await?;

    Ok(Json(SuccessResponse::new(RestorationStatsData {
        total_restorations: stats.total_restorations,
        successful_restorations: stats.successful_restorations,
        total_credits_restored: stats.total_credits_restored,
        last_restoration_date: stats.last_restoration_date,
    })))
}
