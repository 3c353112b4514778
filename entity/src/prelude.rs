pub use super::credit_balances::Entity as CreditBalances;
pub use super::credit_restorations::Entity as CreditRestorations;
pub use super::expiring_credit_batches::Entity as ExpiringCreditBatches;
pub use super::purchases::Entity as Purchases;
