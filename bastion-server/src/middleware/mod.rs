pub mod authentication;
pub mod authorization;

pub use authentication::{get_principal, principal_middleware};
pub use authorization::require_admin;
