use axum::{extract::State, Json};
use tracing::instrument;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    middleware::UserIdentity,
    models::{
        common::SuccessResponse,
        credits::{BalanceData, BalanceResponse, SpendData, SpendRequest, SpendResponse},
    },
};

/// GET /api/v1/credits/balance
#[instrument(skip(state, identity))]
pub async fn get_balance(
    State(state): State<AppState>,
    identity: UserIdentity,
) -> Result<Json<BalanceResponse>> {
    let balance = state.ledger_service.get_balance(identity.user_id).await?;

    Ok(Json(SuccessResponse::new(BalanceData {
        permanent: balance.permanent,
        expiring: balance.expiring,
        total: balance.total,
    })))
}

/// POST /api/v1/credits/spend
///
/// Debits credits ahead of a paid action. The caller must not perform the
/// action unless this returns success.
#[instrument(skip(state, identity, request))]
pub async fn spend_credits(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<SpendRequest>,
) -> Result<Json<SpendResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(format!("Validation error: {}", e)))?;

    let receipt = state
        .ledger_service
        .spend(identity.user_id, request.amount)
        .await?;

    Ok(Json(SuccessResponse::new(SpendData {
        spent: receipt.spent,
        from_expiring: receipt.from_expiring,
        from_permanent: receipt.from_permanent,
        remaining: receipt.remaining,
    })))
}
