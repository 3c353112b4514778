// Service modules
pub mod jwt_service;
pub mod ledger_service;
pub mod purchase_service;
pub mod restoration_service;

pub use jwt_service::JWTService;
pub use ledger_service::LedgerService;
pub use purchase_service::PurchaseService;
pub use restoration_service::RestorationService;
