use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// key: salary-model -> teacher obligation
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Salary {
    pub id: Uuid,
    pub admin_id: i32,
    pub teacher_id: i32,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: DateTime<Utc>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub is_recurring: bool,
    pub pay_type: String,
    pub status: String,
    pub paid_amount: Option<Decimal>,
    pub paid_date: Option<DateTime<Utc>>,
    pub paid_by_id: Option<i32>,
    pub advance_deduction: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A loan from the tenant admin to a teacher, repaid by fixed installments
/// deducted from future salary payments.
///
/// One unified lifecycle covers both the teacher-requested and the
/// admin-issued flows: pending -> rejected | active -> completed | cancelled.
/// A pending request carries `requested_amount` and no balance; approval (or
/// direct issuance) fixes `principal`, computes the installment schedule and
/// activates with `balance = principal`. `balance` never goes negative and the
/// advance is completed exactly when it reaches zero.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SalaryAdvance {
    pub id: Uuid,
    pub admin_id: i32,
    pub teacher_id: i32,
    pub requested_amount: Option<Decimal>,
    pub principal: Decimal,
    pub balance: Decimal,
    pub installments: i32,
    pub installment_amount: Decimal,
    pub total_repaid: Decimal,
    pub currency: String,
    pub status: String,
    pub issued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One amortization event. Append-only; the sum of a given advance's
/// repayments never exceeds its principal.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SalaryAdvanceRepayment {
    pub id: Uuid,
    pub advance_id: Uuid,
    pub salary_payment_id: Uuid,
    pub amount: Decimal,
    pub repaid_at: DateTime<Utc>,
}

/// Immutable record of money actually transferred to a teacher for a period.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SalaryPayment {
    pub id: Uuid,
    pub admin_id: i32,
    pub teacher_id: i32,
    pub salary_id: Option<Uuid>,
    pub gross_amount: Decimal,
    pub advance_deduction: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub paid_date: DateTime<Utc>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewSalary {
    pub admin_id: Option<i32>,
    pub teacher_id: i32,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: DateTime<Utc>,
    pub pay_type: Option<String>,
    /// Recurring rows are the standing pay configuration the monthly
    /// generator copies forward.
    #[serde(default)]
    pub is_recurring: bool,
    pub month: Option<i32>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSalary {
    pub amount: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RequestAdvance {
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveAdvance {
    /// Approved principal; defaults to the requested amount.
    pub amount: Option<Decimal>,
    pub installments: i32,
}

#[derive(Debug, Deserialize)]
pub struct IssueAdvance {
    pub teacher_id: i32,
    pub principal: Decimal,
    pub installments: i32,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordSalaryPayment {
    pub teacher_id: i32,
    pub salary_id: Option<Uuid>,
    pub amount: Decimal,
    pub currency: String,
    pub paid_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExplicitDeductionPayment {
    pub paid_amount: Decimal,
    pub advance_deduction: Decimal,
}
