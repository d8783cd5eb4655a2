pub mod api;
pub mod models;
pub mod service;

pub use models::{Salary, SalaryAdvance, SalaryAdvanceRepayment, SalaryPayment};
pub use service::SalaryService;
