// Route modules
pub mod credits;
pub mod purchases;
pub mod restore;

use crate::{
    app_state::AppState,
    middleware::{jwt_auth_middleware, logging_middleware},
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes(state.clone()))
        .with_state(state)
}

/// API v1 routes — every route acts on the authenticated user's ledger
fn api_v1_routes(state: AppState) -> Router<AppState> {
    let ledger_routes = Router::new()
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/spend", post(credits::spend_credits))
        .route("/purchases", post(purchases::record_purchase))
        .route("/purchases/process", post(purchases::process_receipt))
        .route("/restore", post(restore::verify_and_restore))
        .route("/restore/manual", post(restore::manual_restore))
        .route("/restore/stats", get(restore::get_restoration_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    Router::new().merge(ledger_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn(logging_middleware))
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::new(Duration::from_secs(30))),
    )
}
