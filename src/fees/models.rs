use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// key: fee-model -> student obligation
///
/// Status machine: pending -> processing (payer submits) -> paid (admin verifies),
/// with processing -> pending on revert. `paid_by_id` is only ever set while the
/// fee is processing or paid.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Fee {
    pub id: Uuid,
    pub admin_id: i32,
    pub student_id: i32,
    pub course_id: Option<i32>,
    pub title: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: DateTime<Utc>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub is_recurring: bool,
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

/// Standing recurring-fee template; source of truth for the monthly generator.
/// Yields at most one fee per (student, course, month, year).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FeeDefinition {
    pub id: Uuid,
    pub admin_id: i32,
    pub student_id: i32,
    pub course_id: Option<i32>,
    pub title: String,
    pub amount: Decimal,
    pub currency: String,
    pub generation_day: i32,
    pub start_date: DateTime<Utc>,
    pub due_after_days: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewFee {
    /// Required when a developer creates on behalf of a tenant; ignored for admins.
    pub admin_id: Option<i32>,
    pub student_id: i32,
    pub course_id: Option<i32>,
    pub title: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewFeeDefinition {
    /// Required when a developer creates on behalf of a tenant; ignored for admins.
    pub admin_id: Option<i32>,
    pub student_id: i32,
    pub course_id: Option<i32>,
    pub title: String,
    pub amount: Decimal,
    pub currency: String,
    pub generation_day: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_after_days: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitFeePayment {
    pub amount: Decimal,
    pub payment_details: Option<String>,
    pub payment_proof: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFee {
    pub title: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
}
