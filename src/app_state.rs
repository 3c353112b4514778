use crate::{
    config::Config,
    models::plans::PlanCreditTable,
    services::{JWTService, LedgerService, PurchaseService, RestorationService},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub ledger_service: Arc<LedgerService>,
    pub purchase_service: Arc<PurchaseService>,
    pub restoration_service: Arc<RestorationService>,
    pub jwt_service: Arc<JWTService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        // Connect to database and bring the schema up to date
        let db = sea_orm::Database::connect(&config.database.url).await?;
        Migrator::up(&db, None).await?;

        // Static product catalog, read-only from here on
        let plans = PlanCreditTable::new(config.plans.products.clone());

        // Initialize services
        let ledger_service = Arc::new(LedgerService::new(db.clone()));
        let purchase_service = Arc::new(PurchaseService::new(db.clone(), plans.clone()));
        let restoration_service = Arc::new(RestorationService::new(
            db.clone(),
            plans,
            config.restoration.freshness_window_hours,
        ));
        let jwt_service = Arc::new(JWTService::new(Arc::new(config.auth.clone())));

        Ok(Self {
            db,
            ledger_service,
            purchase_service,
            restoration_service,
            jwt_service,
            config: Arc::new(config),
        })
    }
}
