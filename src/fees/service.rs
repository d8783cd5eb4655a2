use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::error::{AppError, AppResult};
use crate::extractor::{AuthUser, Role};
use crate::money::round_money;
use crate::notifications::{self, NotificationKind};
use crate::tenants;

use super::models::{Fee, FeeDefinition, NewFee, NewFeeDefinition, SubmitFeePayment, UpdateFee};

/// key: fee-service -> fee status machine
#[derive(Clone)]
pub struct FeeService {
    pool: PgPool,
}

impl FeeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Admin (or developer acting for a tenant) creates an ad hoc fee. Every
    /// parent linked to the student is notified, not just one.
    pub async fn create(&self, actor: &AuthUser, payload: NewFee) -> AppResult<Fee> {
        let admin_id = resolve_admin(actor, payload.admin_id)?;
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }
        tenants::tenant_user(&self.pool, admin_id, payload.student_id, Role::Student).await?;

        let mut tx = self.pool.begin().await?;
        let fee = sqlx::query_as::<_, Fee>(
            r#"
            INSERT INTO fees (id, admin_id, student_id, course_id, title, amount, currency, due_date, is_recurring, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(admin_id)
        .bind(payload.student_id)
        .bind(payload.course_id)
        .bind(&payload.title)
        .bind(round_money(payload.amount))
        .bind(&payload.currency)
        .bind(payload.due_date)
        .fetch_one(&mut tx)
        .await?;

        let parents = tenants::parent_ids(&mut tx, fee.student_id).await?;
        for parent_id in parents {
            notifications::enqueue(
                &mut tx,
                NotificationKind::FeeDue,
                "New fee",
                &format!("A fee of {} {} is due on {}", fee.amount, fee.currency, fee.due_date.date_naive()),
                admin_id,
                parent_id,
            )
            .await?;
        }
        tx.commit().await?;
        Ok(fee)
    }

    /// Creates the standing template the monthly generator materializes from.
    /// At most one active definition per (student, course).
    pub async fn create_definition(
        &self,
        actor: &AuthUser,
        payload: NewFeeDefinition,
    ) -> AppResult<FeeDefinition> {
        let admin_id = resolve_admin(actor, payload.admin_id)?;
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }
        let generation_day = payload.generation_day.unwrap_or(1);
        if !(1..=28).contains(&generation_day) {
            return Err(AppError::InvalidInput(
                "generation day must be between 1 and 28".into(),
            ));
        }
        tenants::tenant_user(&self.pool, admin_id, payload.student_id, Role::Student).await?;

        let duplicates = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM fee_definitions
            WHERE student_id = $1 AND course_id IS NOT DISTINCT FROM $2 AND active
            "#,
        )
        .bind(payload.student_id)
        .bind(payload.course_id)
        .fetch_one(&self.pool)
        .await?;
        if duplicates > 0 {
            return Err(AppError::Conflict(
                "an active fee definition already exists for this student and course".into(),
            ));
        }

        let definition = sqlx::query_as::<_, FeeDefinition>(
            r#"
            INSERT INTO fee_definitions (id, admin_id, student_id, course_id, title, amount, currency, generation_day, start_date, due_after_days, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(admin_id)
        .bind(payload.student_id)
        .bind(payload.course_id)
        .bind(&payload.title)
        .bind(round_money(payload.amount))
        .bind(&payload.currency)
        .bind(generation_day)
        .bind(payload.start_date.unwrap_or_else(Utc::now))
        .bind(payload.due_after_days.unwrap_or(0))
        .fetch_one(&self.pool)
        .await?;
        Ok(definition)
    }

    pub async fn list_definitions(&self, actor: &AuthUser) -> AppResult<Vec<FeeDefinition>> {
        let definitions = match actor.role {
            Role::Developer => {
                sqlx::query_as::<_, FeeDefinition>(
                    "SELECT * FROM fee_definitions ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
            Role::Admin => {
                sqlx::query_as::<_, FeeDefinition>(
                    "SELECT * FROM fee_definitions WHERE admin_id = $1 ORDER BY created_at DESC",
                )
                .bind(actor.user_id)
                .fetch_all(&self.pool)
                .await?
            }
            _ => return Err(AppError::Forbidden),
        };
        Ok(definitions)
    }

    /// Stops future generation; fees already materialized are untouched.
    pub async fn deactivate_definition(
        &self,
        actor: &AuthUser,
        definition_id: Uuid,
    ) -> AppResult<FeeDefinition> {
        let definition = sqlx::query_as::<_, FeeDefinition>(
            "SELECT * FROM fee_definitions WHERE id = $1",
        )
        .bind(definition_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)?;
        tenants::require_tenant_access(actor, definition.admin_id)?;
        let updated = sqlx::query_as::<_, FeeDefinition>(
            "UPDATE fee_definitions SET active = FALSE WHERE id = $1 RETURNING *",
        )
        .bind(definition_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    /// Materializes one recurring fee from a definition for (month, year).
    /// Returns false when the instance already exists; running the generator
    /// twice for the same month must not create duplicates.
    pub async fn create_from_definition(
        &self,
        definition: &FeeDefinition,
        month: i32,
        year: i32,
        due_date: DateTime<Utc>,
    ) -> AppResult<bool> {
        let existing = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM fees
            WHERE student_id = $1
              AND course_id IS NOT DISTINCT FROM $2
              AND month = $3 AND year = $4 AND is_recurring
            "#,
        )
        .bind(definition.student_id)
        .bind(definition.course_id)
        .bind(month)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;
        if existing > 0 {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO fees (id, admin_id, student_id, course_id, title, amount, currency, due_date, month, year, is_recurring, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE, 'pending')
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(definition.admin_id)
        .bind(definition.student_id)
        .bind(definition.course_id)
        .bind(&definition.title)
        .bind(round_money(definition.amount))
        .bind(&definition.currency)
        .bind(due_date)
        .bind(month)
        .bind(year)
        .execute(&mut tx)
        .await?;
        if inserted.rows_affected() == 0 {
            // concurrent generator run won the race
            tx.rollback().await?;
            return Ok(false);
        }

        let parents = tenants::parent_ids(&mut tx, definition.student_id).await?;
        for parent_id in parents {
            notifications::enqueue(
                &mut tx,
                NotificationKind::FeeDue,
                "New fee",
                &format!(
                    "A fee of {} {} for {}/{} is due on {}",
                    definition.amount,
                    definition.currency,
                    month,
                    year,
                    due_date.date_naive()
                ),
                definition.admin_id,
                parent_id,
            )
            .await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    pub async fn list(&self, actor: &AuthUser) -> AppResult<Vec<Fee>> {
        let fees = match actor.role {
            Role::Developer => {
                sqlx::query_as::<_, Fee>("SELECT * FROM fees ORDER BY due_date DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
            Role::Admin => {
                sqlx::query_as::<_, Fee>(
                    "SELECT * FROM fees WHERE admin_id = $1 ORDER BY due_date DESC",
                )
                .bind(actor.user_id)
                .fetch_all(&self.pool)
                .await?
            }
            Role::Student => {
                sqlx::query_as::<_, Fee>(
                    "SELECT * FROM fees WHERE student_id = $1 ORDER BY due_date DESC",
                )
                .bind(actor.user_id)
                .fetch_all(&self.pool)
                .await?
            }
            Role::Parent => {
                sqlx::query_as::<_, Fee>(
                    r#"
                    SELECT f.* FROM fees f
                    JOIN student_parents sp ON sp.student_id = f.student_id
                    WHERE sp.parent_id = $1
                    ORDER BY f.due_date DESC
                    "#,
                )
                .bind(actor.user_id)
                .fetch_all(&self.pool)
                .await?
            }
            Role::Teacher => return Err(AppError::Forbidden),
        };
        Ok(fees)
    }

    /// Payer (the fee's student or one of their parents) submits a payment.
    /// The pending -> processing transition is status-guarded so concurrent
    /// submitters serialize; the loser gets InvalidState.
    pub async fn submit_payment(
        &self,
        actor: &AuthUser,
        fee_id: Uuid,
        payload: SubmitFeePayment,
    ) -> AppResult<Fee> {
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }
        let fee = self.fetch(fee_id).await?;
        let is_student = actor.role == Role::Student && actor.user_id == fee.student_id;
        let is_parent = actor.role == Role::Parent
            && tenants::is_parent_of(&self.pool, actor.user_id, fee.student_id).await?;
        if !is_student && !is_parent {
            return Err(AppError::NotFound);
        }

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, Fee>(
            r#"
            UPDATE fees
            SET status = 'processing',
                paid_amount = $2,
                paid_date = NOW(),
                payment_details = $3,
                payment_proof = $4,
                paid_by_id = $5,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(fee_id)
        .bind(round_money(payload.amount))
        .bind(&payload.payment_details)
        .bind(&payload.payment_proof)
        .bind(actor.user_id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or_else(|| AppError::InvalidState("fee is not awaiting payment".into()))?;

        notifications::enqueue(
            &mut tx,
            NotificationKind::PaymentProcessing,
            "Fee payment submitted",
            &format!(
                "A payment of {} {} was submitted for \"{}\" and awaits verification",
                round_money(payload.amount),
                updated.currency,
                updated.title
            ),
            actor.user_id,
            updated.admin_id,
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Owning admin or developer confirms a submitted payment.
    pub async fn verify(&self, actor: &AuthUser, fee_id: Uuid) -> AppResult<Fee> {
        let fee = self.fetch(fee_id).await?;
        tenants::require_tenant_access(actor, fee.admin_id)?;

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, Fee>(
            r#"
            UPDATE fees
            SET status = 'paid', processed_date = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            RETURNING *
            "#,
        )
        .bind(fee_id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or_else(|| AppError::InvalidState("fee has no payment to verify".into()))?;

        let payer = updated.paid_by_id.unwrap_or(updated.student_id);
        notifications::enqueue(
            &mut tx,
            NotificationKind::PaymentVerified,
            "Fee payment verified",
            &format!("Your payment for \"{}\" was verified", updated.title),
            actor.user_id,
            payer,
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Returns a processing fee to pending, clearing the submitted payment.
    /// Only legal within the processing window after submission.
    pub async fn revert(&self, actor: &AuthUser, fee_id: Uuid) -> AppResult<Fee> {
        let fee = self.fetch(fee_id).await?;
        tenants::require_tenant_access(actor, fee.admin_id)?;
        if fee.status != "processing" {
            return Err(AppError::InvalidState("fee has no payment to revert".into()));
        }
        let window = Duration::days(*config::PAYMENT_EDIT_WINDOW_DAYS);
        match fee.paid_date {
            Some(paid_date) if Utc::now() - paid_date <= window => {}
            _ => {
                return Err(AppError::InvalidState(
                    "payment is outside the revert window".into(),
                ))
            }
        }

        let updated = sqlx::query_as::<_, Fee>(
            r#"
            UPDATE fees
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
        .bind(fee_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::InvalidState("fee has no payment to revert".into()))?;
        Ok(updated)
    }

    pub async fn update(
        &self,
        actor: &AuthUser,
        fee_id: Uuid,
        payload: UpdateFee,
    ) -> AppResult<Fee> {
        let fee = self.fetch(fee_id).await?;
        tenants::require_tenant_access(actor, fee.admin_id)?;
        if fee.status == "paid" {
            return Err(AppError::InvalidState("paid fees cannot be edited".into()));
        }
        if let Some(amount) = payload.amount {
            if amount <= Decimal::ZERO {
                return Err(AppError::InvalidInput("amount must be positive".into()));
            }
        }
        let updated = sqlx::query_as::<_, Fee>(
            r#"
            UPDATE fees
            SET title = COALESCE($2, title),
                amount = COALESCE($3, amount),
                due_date = COALESCE($4, due_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(fee_id)
        .bind(&payload.title)
        .bind(payload.amount.map(round_money))
        .bind(payload.due_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    pub async fn delete(&self, actor: &AuthUser, fee_id: Uuid) -> AppResult<()> {
        let fee = self.fetch(fee_id).await?;
        tenants::require_tenant_access(actor, fee.admin_id)?;
        sqlx::query("DELETE FROM fees WHERE id = $1")
            .bind(fee_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fetch(&self, fee_id: Uuid) -> AppResult<Fee> {
        sqlx::query_as::<_, Fee>("SELECT * FROM fees WHERE id = $1")
            .bind(fee_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }
}

fn resolve_admin(actor: &AuthUser, explicit: Option<i32>) -> AppResult<i32> {
    match actor.role {
        Role::Admin => Ok(actor.user_id),
        Role::Developer => explicit.ok_or_else(|| {
            AppError::InvalidInput("developer must specify the tenant admin".into())
        }),
        _ => Err(AppError::Forbidden),
    }
}
