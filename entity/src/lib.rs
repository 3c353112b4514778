pub mod prelude;

pub mod credit_balances;
pub mod credit_restorations;
pub mod expiring_credit_batches;
pub mod purchases;
