pub mod auth;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fees;
pub mod money;
pub mod notifications;
pub mod routes;
pub mod salaries;
pub mod scheduler;
pub mod subscriptions;
pub mod tenants;

pub use error::{AppError, AppResult};
pub use extractor::{AuthUser, Role};
