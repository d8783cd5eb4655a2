pub mod api;
pub mod models;
pub mod service;

pub use models::{Fee, FeeDefinition};
pub use service::FeeService;
