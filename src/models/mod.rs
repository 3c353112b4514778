// Request/Response models
pub mod common;
pub mod credits;
pub mod plans;
pub mod purchases;
pub mod restoration;
