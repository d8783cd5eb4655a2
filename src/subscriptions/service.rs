use chrono::{DateTime, Duration, Months, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::config;
use crate::error::{AppError, AppResult};
use crate::extractor::{AuthUser, Role};
use crate::money::round_money;
use crate::notifications::{self, NotificationKind};
use crate::tenants;

use super::models::{
    ExtendSubscription, NewSubscription, ProcessRenewal, SubmitRenewal,
    SubmitSubscriptionPayment, Subscription, SubscriptionRenewal, VerifySubscription,
};

/// Calendar-aware expiry for an extension from `base`. Monthly adds one
/// calendar month, yearly one calendar year (day-clamped: Jan 31 -> Feb 28/29);
/// lifetime has no expiry.
pub fn extended_expiry(plan: &str, base: DateTime<Utc>) -> AppResult<Option<DateTime<Utc>>> {
    match plan {
        "lifetime" => Ok(None),
        "monthly" => Ok(Some(
            base.checked_add_months(Months::new(1)).unwrap_or(base),
        )),
        "yearly" => Ok(Some(
            base.checked_add_months(Months::new(12)).unwrap_or(base),
        )),
        other => Err(AppError::InvalidInput(format!("unknown plan: {other}"))),
    }
}

/// Audit-row stand-in for "never expires".
pub fn lifetime_sentinel() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 0, 0, 0).single().expect("valid sentinel")
}

/// key: subscription-service -> tenant subscription lifecycle
#[derive(Clone)]
pub struct SubscriptionService {
    pool: PgPool,
}

impl SubscriptionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The tenant's current subscription: latest row of its ordered history,
    /// never a cached field.
    pub async fn current_subscription(&self, admin_id: i32) -> AppResult<Option<Subscription>> {
        let record = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE admin_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn create(&self, actor: &AuthUser, payload: NewSubscription) -> AppResult<Subscription> {
        if actor.role != Role::Developer {
            return Err(AppError::Forbidden);
        }
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }
        let start = payload.start_date.unwrap_or_else(Utc::now);
        let end = extended_expiry(&payload.plan, start)?;
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (id, admin_id, plan, amount, currency, start_date, end_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payload.admin_id)
        .bind(&payload.plan)
        .bind(round_money(payload.amount))
        .bind(&payload.currency)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(subscription)
    }

    pub async fn list(&self, actor: &AuthUser) -> AppResult<Vec<Subscription>> {
        let rows = match actor.role {
            Role::Developer => {
                sqlx::query_as::<_, Subscription>(
                    "SELECT * FROM subscriptions ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
            Role::Admin => {
                sqlx::query_as::<_, Subscription>(
                    "SELECT * FROM subscriptions WHERE admin_id = $1 ORDER BY created_at DESC",
                )
                .bind(actor.user_id)
                .fetch_all(&self.pool)
                .await?
            }
            _ => return Err(AppError::Forbidden),
        };
        Ok(rows)
    }

    /// Owning admin submits payment evidence; every developer is notified.
    pub async fn submit_payment(
        &self,
        actor: &AuthUser,
        subscription_id: Uuid,
        payload: SubmitSubscriptionPayment,
    ) -> AppResult<Subscription> {
        if actor.role != Role::Admin {
            return Err(AppError::Forbidden);
        }
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }
        let subscription = self.fetch(subscription_id).await?;
        if subscription.admin_id != actor.user_id {
            return Err(AppError::NotFound);
        }
        if subscription.status == "active" && subscription.paid_amount.is_some() {
            return Err(AppError::InvalidState("subscription already paid".into()));
        }

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET status = 'processing',
                paid_amount = $2,
                paid_date = NOW(),
                payment_details = $3,
                payment_proof = $4,
                paid_by_id = $5,
                updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'active')
            RETURNING *
            "#,
        )
        .bind(subscription_id)
        .bind(round_money(payload.amount))
        .bind(&payload.payment_details)
        .bind(&payload.payment_proof)
        .bind(actor.user_id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or_else(|| AppError::InvalidState("subscription is not awaiting payment".into()))?;

        for developer_id in tenants::developer_ids(&mut tx).await? {
            notifications::enqueue(
                &mut tx,
                NotificationKind::SubscriptionPaid,
                "Subscription payment submitted",
                &format!(
                    "A subscription payment of {} {} awaits verification",
                    round_money(payload.amount),
                    updated.currency
                ),
                actor.user_id,
                developer_id,
            )
            .await?;
        }
        tx.commit().await?;
        Ok(updated)
    }

    /// Edits the submitted payment. Only legal while processing and inside the
    /// processing window.
    pub async fn edit_submitted_payment(
        &self,
        actor: &AuthUser,
        subscription_id: Uuid,
        payload: SubmitSubscriptionPayment,
    ) -> AppResult<Subscription> {
        let subscription = self.editable_submission(actor, subscription_id).await?;
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }
        let updated = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET paid_amount = $2,
                payment_details = $3,
                payment_proof = $4,
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            RETURNING *
            "#,
        )
        .bind(subscription.id)
        .bind(round_money(payload.amount))
        .bind(&payload.payment_details)
        .bind(&payload.payment_proof)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::InvalidState("no submitted payment to edit".into()))?;
        Ok(updated)
    }

    /// Withdraws the submitted payment, returning the subscription to pending.
    pub async fn clear_submitted_payment(
        &self,
        actor: &AuthUser,
        subscription_id: Uuid,
    ) -> AppResult<Subscription> {
        let subscription = self.editable_submission(actor, subscription_id).await?;
        let updated = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET status = 'pending',
                paid_amount = NULL,
                paid_date = NULL,
                payment_details = NULL,
                payment_proof = NULL,
                paid_by_id = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            RETURNING *
            "#,
        )
        .bind(subscription.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::InvalidState("no submitted payment to clear".into()))?;
        Ok(updated)
    }

    /// Developer approves or rejects a submitted payment.
    pub async fn verify(
        &self,
        actor: &AuthUser,
        subscription_id: Uuid,
        payload: VerifySubscription,
    ) -> AppResult<Subscription> {
        if actor.role != Role::Developer {
            return Err(AppError::Forbidden);
        }
        let subscription = self.fetch(subscription_id).await?;

        let mut tx = self.pool.begin().await?;
        let updated = if payload.approved {
            sqlx::query_as::<_, Subscription>(
                r#"
                UPDATE subscriptions
                SET status = 'active', processed_date = NOW(), updated_at = NOW()
                WHERE id = $1 AND status = 'processing'
                RETURNING *
                "#,
            )
            .bind(subscription_id)
            .fetch_optional(&mut tx)
            .await?
        } else {
            // payment fields stay so the admin can adjust and resubmit
            sqlx::query_as::<_, Subscription>(
                r#"
                UPDATE subscriptions
                SET status = 'pending', updated_at = NOW()
                WHERE id = $1 AND status = 'processing'
                RETURNING *
                "#,
            )
            .bind(subscription_id)
            .fetch_optional(&mut tx)
            .await?
        }
        .ok_or_else(|| AppError::InvalidState("subscription has no payment to verify".into()))?;

        let (title, message) = if payload.approved {
            (
                "Subscription activated",
                "Your subscription payment was approved and the subscription is active".to_string(),
            )
        } else {
            (
                "Subscription payment rejected",
                "Your subscription payment was rejected; please review and resubmit".to_string(),
            )
        };
        notifications::enqueue(
            &mut tx,
            NotificationKind::SubscriptionPaid,
            title,
            &message,
            actor.user_id,
            subscription.admin_id,
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Developer extends a tenant's subscription, additively from the current
    /// active expiry when one exists, else from now.
    pub async fn extend(
        &self,
        actor: &AuthUser,
        admin_id: i32,
        payload: ExtendSubscription,
    ) -> AppResult<Subscription> {
        if actor.role != Role::Developer {
            return Err(AppError::Forbidden);
        }
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }

        let mut tx = self.pool.begin().await?;
        let subscription =
            apply_extension(&mut tx, actor.user_id, admin_id, &payload.plan, payload.amount, &payload.currency)
                .await?;
        notifications::enqueue(
            &mut tx,
            NotificationKind::SubscriptionPaid,
            "Subscription extended",
            &match subscription.end_date {
                Some(end) => format!("Your subscription now runs until {}", end.date_naive()),
                None => "Your subscription is now lifetime".to_string(),
            },
            actor.user_id,
            admin_id,
        )
        .await?;
        tx.commit().await?;
        Ok(subscription)
    }

    /// Admin submits a renewal for developer processing.
    pub async fn submit_renewal(
        &self,
        actor: &AuthUser,
        payload: SubmitRenewal,
    ) -> AppResult<SubscriptionRenewal> {
        if actor.role != Role::Admin {
            return Err(AppError::Forbidden);
        }
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }
        extended_expiry(&payload.plan, Utc::now())?;
        let current = self.current_subscription(actor.user_id).await?;

        let mut tx = self.pool.begin().await?;
        let renewal = sqlx::query_as::<_, SubscriptionRenewal>(
            r#"
            INSERT INTO subscription_renewals (id, admin_id, subscription_id, plan, amount, currency, payment_details, payment_proof, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id)
        .bind(current.map(|s| s.id))
        .bind(&payload.plan)
        .bind(round_money(payload.amount))
        .bind(&payload.currency)
        .bind(&payload.payment_details)
        .bind(&payload.payment_proof)
        .fetch_one(&mut tx)
        .await?;

        for developer_id in tenants::developer_ids(&mut tx).await? {
            notifications::enqueue(
                &mut tx,
                NotificationKind::SubscriptionDue,
                "Subscription renewal submitted",
                &format!(
                    "A {} renewal of {} {} awaits processing",
                    renewal.plan, renewal.amount, renewal.currency
                ),
                actor.user_id,
                developer_id,
            )
            .await?;
        }
        tx.commit().await?;
        Ok(renewal)
    }

    /// Developer processes a pending renewal. Approval extends the tenant's
    /// subscription and re-activates users disabled for non-payment; manual
    /// disables are never undone.
    pub async fn process_renewal(
        &self,
        actor: &AuthUser,
        renewal_id: Uuid,
        payload: ProcessRenewal,
    ) -> AppResult<SubscriptionRenewal> {
        if actor.role != Role::Developer {
            return Err(AppError::Forbidden);
        }
        let renewal = sqlx::query_as::<_, SubscriptionRenewal>(
            "SELECT * FROM subscription_renewals WHERE id = $1",
        )
        .bind(renewal_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)?;

        let mut tx = self.pool.begin().await?;
        let next_status = if payload.approved { "processed" } else { "rejected" };
        let updated = sqlx::query_as::<_, SubscriptionRenewal>(
            r#"
            UPDATE subscription_renewals
            SET status = $2, processed_at = NOW(), processed_by_id = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(renewal_id)
        .bind(next_status)
        .bind(actor.user_id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or_else(|| AppError::InvalidState("renewal already processed".into()))?;

        if payload.approved {
            apply_extension(
                &mut tx,
                actor.user_id,
                renewal.admin_id,
                &renewal.plan,
                renewal.amount,
                &renewal.currency,
            )
            .await?;
            let reactivated = tenants::reactivate_after_renewal(&mut tx, renewal.admin_id).await?;
            if reactivated > 0 {
                tracing::info!(
                    admin_id = renewal.admin_id,
                    reactivated,
                    "re-activated users after renewal"
                );
            }
            notifications::enqueue(
                &mut tx,
                NotificationKind::SubscriptionPaid,
                "Subscription renewed",
                "Your renewal was processed and the subscription extended",
                actor.user_id,
                renewal.admin_id,
            )
            .await?;
        } else {
            notifications::enqueue(
                &mut tx,
                NotificationKind::SystemAlert,
                "Subscription renewal rejected",
                "Your renewal submission was rejected; please review and resubmit",
                actor.user_id,
                renewal.admin_id,
            )
            .await?;
        }
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn list_renewals(&self, actor: &AuthUser) -> AppResult<Vec<SubscriptionRenewal>> {
        let rows = match actor.role {
            Role::Developer => {
                sqlx::query_as::<_, SubscriptionRenewal>(
                    "SELECT * FROM subscription_renewals ORDER BY submitted_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
            Role::Admin => {
                sqlx::query_as::<_, SubscriptionRenewal>(
                    "SELECT * FROM subscription_renewals WHERE admin_id = $1 ORDER BY submitted_at DESC",
                )
                .bind(actor.user_id)
                .fetch_all(&self.pool)
                .await?
            }
            _ => return Err(AppError::Forbidden),
        };
        Ok(rows)
    }

    async fn fetch(&self, subscription_id: Uuid) -> AppResult<Subscription> {
        sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
            .bind(subscription_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Common guard for edit/clear: owner, processing, inside the window.
    async fn editable_submission(
        &self,
        actor: &AuthUser,
        subscription_id: Uuid,
    ) -> AppResult<Subscription> {
        if actor.role != Role::Admin {
            return Err(AppError::Forbidden);
        }
        let subscription = self.fetch(subscription_id).await?;
        if subscription.admin_id != actor.user_id {
            return Err(AppError::NotFound);
        }
        if subscription.status != "processing" {
            return Err(AppError::InvalidState("no submitted payment".into()));
        }
        let window = Duration::days(*config::PAYMENT_EDIT_WINDOW_DAYS);
        match subscription.paid_date {
            Some(paid_date) if Utc::now() - paid_date <= window => Ok(subscription),
            _ => Err(AppError::InvalidState(
                "payment is outside the edit window".into(),
            )),
        }
    }
}

/// Extends the tenant's current subscription (creating one when the tenant has
/// no history) and writes the audit row. Runs inside the caller's transaction.
async fn apply_extension(
    tx: &mut Transaction<'_, Postgres>,
    recorded_by_id: i32,
    admin_id: i32,
    plan: &str,
    amount: Decimal,
    currency: &str,
) -> AppResult<Subscription> {
    let now = Utc::now();
    let current = sqlx::query_as::<_, Subscription>(
        "SELECT * FROM subscriptions WHERE admin_id = $1 ORDER BY created_at DESC LIMIT 1 FOR UPDATE",
    )
    .bind(admin_id)
    .fetch_optional(&mut *tx)
    .await?;

    // additive from the active expiry when one exists, else from now
    let base = match &current {
        Some(sub) if sub.status == "active" => sub.end_date.unwrap_or(now),
        _ => now,
    };
    let new_end = extended_expiry(plan, base)?;

    let subscription = match current {
        Some(sub) => {
            sqlx::query_as::<_, Subscription>(
                r#"
                UPDATE subscriptions
                SET plan = $2,
                    amount = $3,
                    currency = $4,
                    end_date = $5,
                    status = 'active',
                    processed_date = NOW(),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(sub.id)
            .bind(plan)
            .bind(round_money(amount))
            .bind(currency)
            .bind(new_end)
            .fetch_one(&mut *tx)
            .await?
        }
        None => {
            sqlx::query_as::<_, Subscription>(
                r#"
                INSERT INTO subscriptions (id, admin_id, plan, amount, currency, start_date, end_date, status, processed_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 'active', NOW())
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(admin_id)
            .bind(plan)
            .bind(round_money(amount))
            .bind(currency)
            .bind(now)
            .bind(new_end)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    sqlx::query(
        r#"
        INSERT INTO subscription_payments (id, subscription_id, admin_id, amount, currency, plan, paid_date, expiry_extended, recorded_by_id)
        VALUES ($1, $2, $3, $4, $5, $6, NOW(), $7, $8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(subscription.id)
    .bind(admin_id)
    .bind(round_money(amount))
    .bind(currency)
    .bind(plan)
    .bind(new_end.unwrap_or_else(lifetime_sentinel))
    .bind(recorded_by_id)
    .execute(&mut *tx)
    .await?;

    Ok(subscription)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).single().unwrap()
    }

    #[test]
    fn monthly_extension_clamps_to_month_end() {
        let end = extended_expiry("monthly", at(2023, 1, 31)).unwrap().unwrap();
        assert_eq!(end.date_naive().to_string(), "2023-02-28");
    }

    #[test]
    fn monthly_extension_clamps_to_leap_day() {
        let end = extended_expiry("monthly", at(2024, 1, 31)).unwrap().unwrap();
        assert_eq!(end.date_naive().to_string(), "2024-02-29");
    }

    #[test]
    fn yearly_extension_adds_calendar_year() {
        let end = extended_expiry("yearly", at(2023, 3, 15)).unwrap().unwrap();
        assert_eq!(end.date_naive().to_string(), "2024-03-15");
    }

    #[test]
    fn yearly_extension_from_leap_day_clamps() {
        let end = extended_expiry("yearly", at(2024, 2, 29)).unwrap().unwrap();
        assert_eq!(end.date_naive().to_string(), "2025-02-28");
    }

    #[test]
    fn lifetime_has_no_expiry() {
        assert!(extended_expiry("lifetime", at(2023, 1, 1)).unwrap().is_none());
    }

    #[test]
    fn unknown_plan_is_invalid_input() {
        assert!(extended_expiry("weekly", at(2023, 1, 1)).is_err());
    }
}
