pub use sea_orm_migration::prelude::*;

mod m20260112_000001_create_credit_balances;
mod m20260112_000002_create_expiring_credit_batches;
mod m20260112_000003_create_purchases;
mod m20260112_000004_create_credit_restorations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260112_000001_create_credit_balances::Migration),
            Box::new(m20260112_000002_create_expiring_credit_batches::Migration),
            Box::new(m20260112_000003_create_purchases::Migration),
            Box::new(m20260112_000004_create_credit_restorations::Migration),
        ]
    }
}
