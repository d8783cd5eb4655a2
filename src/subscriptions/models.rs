use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// key: subscription-model -> tenant billing relationship
///
/// Status machine: pending -> processing (admin submits) -> active (developer
/// approves) | pending (developer rejects); active -> expired on lapse.
/// `end_date` is NULL exactly for lifetime plans.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub admin_id: i32,
    pub plan: String,
    pub amount: Decimal,
    pub currency: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: String,
    pub paid_amount: Option<Decimal>,
    pub paid_date: Option<DateTime<Utc>>,
    pub payment_details: Option<String>,
    pub payment_proof: Option<String>,
    pub paid_by_id: Option<i32>,
    pub processed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable audit record of a subscription charge or extension.
/// `expiry_extended` carries the resulting end date, or the far-future
/// sentinel for lifetime plans.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubscriptionPayment {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub admin_id: i32,
    pub amount: Decimal,
    pub currency: String,
    pub plan: String,
    pub paid_date: DateTime<Utc>,
    pub expiry_extended: DateTime<Utc>,
    pub recorded_by_id: i32,
}

/// A renewal submission awaiting developer processing.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubscriptionRenewal {
    pub id: Uuid,
    pub admin_id: i32,
    pub subscription_id: Option<Uuid>,
    pub plan: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_details: Option<String>,
    pub payment_proof: Option<String>,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct NewSubscription {
    pub admin_id: i32,
    pub plan: String,
    pub amount: Decimal,
    pub currency: String,
    pub start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitSubscriptionPayment {
    pub amount: Decimal,
    pub payment_details: Option<String>,
    pub payment_proof: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifySubscription {
    pub approved: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExtendSubscription {
    pub plan: String,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRenewal {
    pub plan: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_details: Option<String>,
    pub payment_proof: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessRenewal {
    pub approved: bool,
}
