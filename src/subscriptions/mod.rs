pub mod api;
pub mod models;
pub mod service;

pub use models::{Subscription, SubscriptionPayment, SubscriptionRenewal};
pub use service::SubscriptionService;
