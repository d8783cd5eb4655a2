use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::extractor::{AuthUser, Role};
use crate::money::{clamp_non_negative, installment_amount, round_money};
use crate::notifications::{self, NotificationKind};
use crate::tenants;

use super::models::{
    ApproveAdvance, ExplicitDeductionPayment, IssueAdvance, NewSalary, RecordSalaryPayment,
    RequestAdvance, Salary, SalaryAdvance, SalaryPayment, UpdateSalary,
};

/// One advance's share of a salary payment, planned before any row is touched.
#[derive(Debug, PartialEq)]
struct PlannedDeduction {
    advance_id: Uuid,
    amount: Decimal,
    completes: bool,
}

/// FIFO amortization plan across all of a teacher's active advances. Input must
/// be ordered oldest-first; every advance gets at most one installment per
/// salary payment, clamped to its remaining balance.
fn plan_amortization(advances: &[SalaryAdvance]) -> (Vec<PlannedDeduction>, Decimal) {
    let mut plan = Vec::with_capacity(advances.len());
    let mut total = Decimal::ZERO;
    for advance in advances {
        if advance.balance <= Decimal::ZERO {
            plan.push(PlannedDeduction {
                advance_id: advance.id,
                amount: Decimal::ZERO,
                completes: true,
            });
            continue;
        }
        let installment = round_money(advance.installment_amount.min(advance.balance));
        total += installment;
        plan.push(PlannedDeduction {
            advance_id: advance.id,
            amount: installment,
            completes: advance.balance - installment <= Decimal::ZERO,
        });
    }
    (plan, total)
}

/// key: salary-service -> payroll + advance amortization
#[derive(Clone)]
pub struct SalaryService {
    pool: PgPool,
}

impl SalaryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, actor: &AuthUser, payload: NewSalary) -> AppResult<Salary> {
        let admin_id = self.resolve_admin(actor, payload.admin_id, payload.teacher_id).await?;
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }
        if payload.is_recurring && (payload.month.is_none() || payload.year.is_none()) {
            return Err(AppError::InvalidInput(
                "recurring salaries need a month and year".into(),
            ));
        }
        let salary = sqlx::query_as::<_, Salary>(
            r#"
            INSERT INTO salaries (id, admin_id, teacher_id, amount, currency, due_date, month, year, is_recurring, pay_type, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(admin_id)
        .bind(payload.teacher_id)
        .bind(round_money(payload.amount))
        .bind(&payload.currency)
        .bind(payload.due_date)
        .bind(payload.month)
        .bind(payload.year)
        .bind(payload.is_recurring)
        .bind(payload.pay_type.as_deref().unwrap_or("monthly"))
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.constraint() == Some("salaries_recurring_unique") => {
                AppError::Conflict("a recurring salary for that month already exists".into())
            }
            _ => AppError::Db(err),
        })?;
        Ok(salary)
    }

    pub async fn list(&self, actor: &AuthUser) -> AppResult<Vec<Salary>> {
        let salaries = match actor.role {
            Role::Developer => {
                sqlx::query_as::<_, Salary>("SELECT * FROM salaries ORDER BY due_date DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
            Role::Admin => {
                sqlx::query_as::<_, Salary>(
                    "SELECT * FROM salaries WHERE admin_id = $1 ORDER BY due_date DESC",
                )
                .bind(actor.user_id)
                .fetch_all(&self.pool)
                .await?
            }
            Role::Teacher => {
                sqlx::query_as::<_, Salary>(
                    "SELECT * FROM salaries WHERE teacher_id = $1 ORDER BY due_date DESC",
                )
                .bind(actor.user_id)
                .fetch_all(&self.pool)
                .await?
            }
            _ => return Err(AppError::Forbidden),
        };
        Ok(salaries)
    }

    pub async fn update(
        &self,
        actor: &AuthUser,
        salary_id: Uuid,
        payload: UpdateSalary,
    ) -> AppResult<Salary> {
        let salary = self.fetch_salary(salary_id).await?;
        tenants::require_tenant_access(actor, salary.admin_id)?;
        if salary.status == "paid" {
            return Err(AppError::InvalidState("paid salaries cannot be edited".into()));
        }
        if let Some(amount) = payload.amount {
            if amount <= Decimal::ZERO {
                return Err(AppError::InvalidInput("amount must be positive".into()));
            }
        }
        let updated = sqlx::query_as::<_, Salary>(
            r#"
            UPDATE salaries
            SET amount = COALESCE($2, amount),
                due_date = COALESCE($3, due_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(salary_id)
        .bind(payload.amount.map(round_money))
        .bind(payload.due_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    /// Teacher asks their admin for an advance; sits pending until approval.
    pub async fn request_advance(
        &self,
        actor: &AuthUser,
        payload: RequestAdvance,
    ) -> AppResult<SalaryAdvance> {
        if actor.role != Role::Teacher {
            return Err(AppError::Forbidden);
        }
        let admin_id = actor
            .tenant_id
            .ok_or_else(|| AppError::InvalidInput("teacher has no tenant".into()))?;
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }

        let mut tx = self.pool.begin().await?;
        let advance = sqlx::query_as::<_, SalaryAdvance>(
            r#"
            INSERT INTO salary_advances (id, admin_id, teacher_id, requested_amount, principal, balance, installments, installment_amount, total_repaid, currency, status)
            VALUES ($1, $2, $3, $4, $4, 0, 0, 0, 0, $5, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(admin_id)
        .bind(actor.user_id)
        .bind(round_money(payload.amount))
        .bind(&payload.currency)
        .fetch_one(&mut tx)
        .await?;

        notifications::enqueue(
            &mut tx,
            NotificationKind::SystemAlert,
            "Salary advance requested",
            &format!(
                "An advance of {} {} was requested",
                advance.principal, advance.currency
            ),
            actor.user_id,
            admin_id,
        )
        .await?;
        tx.commit().await?;
        Ok(advance)
    }

    /// Owning admin approves a pending request, fixing the installment schedule
    /// and activating the advance.
    pub async fn approve_advance(
        &self,
        actor: &AuthUser,
        advance_id: Uuid,
        payload: ApproveAdvance,
    ) -> AppResult<SalaryAdvance> {
        let advance = self.fetch_advance(advance_id).await?;
        tenants::require_tenant_access(actor, advance.admin_id)?;
        let principal = payload
            .amount
            .or(advance.requested_amount)
            .ok_or_else(|| AppError::InvalidInput("approved amount required".into()))?;
        if principal <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }
        if payload.installments < 1 {
            return Err(AppError::InvalidInput("installments must be at least 1".into()));
        }
        let per_installment = installment_amount(principal, payload.installments);

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, SalaryAdvance>(
            r#"
            UPDATE salary_advances
            SET principal = $2,
                balance = $2,
                installments = $3,
                installment_amount = $4,
                status = 'active',
                issued_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(advance_id)
        .bind(round_money(principal))
        .bind(payload.installments)
        .bind(per_installment)
        .fetch_optional(&mut tx)
        .await?
        .ok_or_else(|| AppError::InvalidState("advance is not awaiting approval".into()))?;

        notifications::enqueue(
            &mut tx,
            NotificationKind::SalaryAdvanceApproved,
            "Salary advance approved",
            &format!(
                "Your advance of {} {} was approved, repaid over {} installments of {}",
                updated.principal, updated.currency, updated.installments, updated.installment_amount
            ),
            actor.user_id,
            updated.teacher_id,
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn reject_advance(
        &self,
        actor: &AuthUser,
        advance_id: Uuid,
    ) -> AppResult<SalaryAdvance> {
        let advance = self.fetch_advance(advance_id).await?;
        tenants::require_tenant_access(actor, advance.admin_id)?;

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, SalaryAdvance>(
            "UPDATE salary_advances SET status = 'rejected' WHERE id = $1 AND status = 'pending' RETURNING *",
        )
        .bind(advance_id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or_else(|| AppError::InvalidState("advance is not awaiting approval".into()))?;

        notifications::enqueue(
            &mut tx,
            NotificationKind::SystemAlert,
            "Salary advance rejected",
            "Your advance request was rejected",
            actor.user_id,
            updated.teacher_id,
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Admin issues an advance directly, skipping the request step.
    pub async fn issue_advance(
        &self,
        actor: &AuthUser,
        payload: IssueAdvance,
    ) -> AppResult<SalaryAdvance> {
        let admin_id = self.resolve_admin(actor, None, payload.teacher_id).await?;
        if payload.principal <= Decimal::ZERO {
            return Err(AppError::InvalidInput("principal must be positive".into()));
        }
        if payload.installments < 1 {
            return Err(AppError::InvalidInput("installments must be at least 1".into()));
        }
        let per_installment = installment_amount(payload.principal, payload.installments);

        let mut tx = self.pool.begin().await?;
        let advance = sqlx::query_as::<_, SalaryAdvance>(
            r#"
            INSERT INTO salary_advances (id, admin_id, teacher_id, principal, balance, installments, installment_amount, total_repaid, currency, status, issued_at)
            VALUES ($1, $2, $3, $4, $4, $5, $6, 0, $7, 'active', NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(admin_id)
        .bind(payload.teacher_id)
        .bind(round_money(payload.principal))
        .bind(payload.installments)
        .bind(per_installment)
        .bind(&payload.currency)
        .fetch_one(&mut tx)
        .await?;

        notifications::enqueue(
            &mut tx,
            NotificationKind::SalaryAdvanceApproved,
            "Salary advance issued",
            &format!(
                "An advance of {} {} was issued, repaid over {} installments of {}",
                advance.principal, advance.currency, advance.installments, advance.installment_amount
            ),
            admin_id,
            advance.teacher_id,
        )
        .await?;
        tx.commit().await?;
        Ok(advance)
    }

    /// Forgives the remaining balance; no further deductions happen.
    pub async fn cancel_advance(
        &self,
        actor: &AuthUser,
        advance_id: Uuid,
    ) -> AppResult<SalaryAdvance> {
        let advance = self.fetch_advance(advance_id).await?;
        tenants::require_tenant_access(actor, advance.admin_id)?;
        sqlx::query_as::<_, SalaryAdvance>(
            "UPDATE salary_advances SET status = 'cancelled' WHERE id = $1 AND status = 'active' RETURNING *",
        )
        .bind(advance_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::InvalidState("only active advances can be cancelled".into()))
    }

    pub async fn list_advances(&self, actor: &AuthUser) -> AppResult<Vec<SalaryAdvance>> {
        let advances = match actor.role {
            Role::Developer => {
                sqlx::query_as::<_, SalaryAdvance>(
                    "SELECT * FROM salary_advances ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
            Role::Admin => {
                sqlx::query_as::<_, SalaryAdvance>(
                    "SELECT * FROM salary_advances WHERE admin_id = $1 ORDER BY created_at DESC",
                )
                .bind(actor.user_id)
                .fetch_all(&self.pool)
                .await?
            }
            Role::Teacher => {
                sqlx::query_as::<_, SalaryAdvance>(
                    "SELECT * FROM salary_advances WHERE teacher_id = $1 ORDER BY created_at DESC",
                )
                .bind(actor.user_id)
                .fetch_all(&self.pool)
                .await?
            }
            _ => return Err(AppError::Forbidden),
        };
        Ok(advances)
    }

    /// Records a salary payment and amortizes every active advance of the
    /// teacher, oldest first, in one transaction. Either the payment row, the
    /// salary update, all repayment rows and the notifications commit together
    /// or none of them do.
    pub async fn record_payment(
        &self,
        actor: &AuthUser,
        payload: RecordSalaryPayment,
    ) -> AppResult<SalaryPayment> {
        let admin_id = self.resolve_admin(actor, None, payload.teacher_id).await?;
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }
        let gross = round_money(payload.amount);
        let paid_date = payload.paid_date.unwrap_or_else(Utc::now);

        let mut tx = self.pool.begin().await?;

        let advances = sqlx::query_as::<_, SalaryAdvance>(
            r#"
            SELECT * FROM salary_advances
            WHERE teacher_id = $1 AND admin_id = $2 AND status = 'active'
            ORDER BY issued_at ASC
            FOR UPDATE
            "#,
        )
        .bind(payload.teacher_id)
        .bind(admin_id)
        .fetch_all(&mut tx)
        .await?;

        let (plan, total_deduction) = plan_amortization(&advances);
        let net = clamp_non_negative(gross - total_deduction);

        let payment = sqlx::query_as::<_, SalaryPayment>(
            r#"
            INSERT INTO salary_payments (id, admin_id, teacher_id, salary_id, gross_amount, advance_deduction, net_amount, currency, paid_date, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(admin_id)
        .bind(payload.teacher_id)
        .bind(payload.salary_id)
        .bind(gross)
        .bind(total_deduction)
        .bind(net)
        .bind(&payload.currency)
        .bind(paid_date)
        .bind(&payload.note)
        .fetch_one(&mut tx)
        .await?;

        if let Some(salary_id) = payload.salary_id {
            let updated = sqlx::query(
                r#"
                UPDATE salaries
                SET status = 'paid',
                    paid_amount = $3,
                    paid_date = $4,
                    paid_by_id = $5,
                    advance_deduction = $6,
                    updated_at = NOW()
                WHERE id = $1 AND admin_id = $2 AND teacher_id = $7 AND status <> 'paid'
                "#,
            )
            .bind(salary_id)
            .bind(admin_id)
            .bind(net)
            .bind(paid_date)
            .bind(actor.user_id)
            .bind(total_deduction)
            .bind(payload.teacher_id)
            .execute(&mut tx)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(AppError::InvalidState(
                    "salary is missing or already paid".into(),
                ));
            }
        }

        for step in &plan {
            if step.amount > Decimal::ZERO {
                sqlx::query(
                    r#"
                    INSERT INTO salary_advance_repayments (id, advance_id, salary_payment_id, amount, repaid_at)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(step.advance_id)
                .bind(payment.id)
                .bind(step.amount)
                .bind(paid_date)
                .execute(&mut tx)
                .await?;
            }
            sqlx::query(
                r#"
                UPDATE salary_advances
                SET balance = balance - $2,
                    total_repaid = total_repaid + $2,
                    status = CASE WHEN balance - $2 <= 0 THEN 'completed' ELSE status END
                WHERE id = $1
                "#,
            )
            .bind(step.advance_id)
            .bind(step.amount)
            .execute(&mut tx)
            .await?;
            if step.completes {
                notifications::enqueue(
                    &mut tx,
                    NotificationKind::SalaryAdvanceRepaid,
                    "Salary advance repaid",
                    "Your salary advance has been fully repaid",
                    admin_id,
                    payload.teacher_id,
                )
                .await?;
            }
        }

        notifications::enqueue(
            &mut tx,
            NotificationKind::SalaryPaid,
            "Salary paid",
            &format!(
                "A salary payment of {} {} was recorded ({} deducted for advances)",
                net, payment.currency, total_deduction
            ),
            actor.user_id,
            payload.teacher_id,
        )
        .await?;

        tx.commit().await?;
        Ok(payment)
    }

    /// Alternate entry point: the admin names the deduction instead of letting
    /// the engine amortize. The deduction lands on the single oldest active
    /// advance, clamped to its balance.
    pub async fn pay_with_explicit_deduction(
        &self,
        actor: &AuthUser,
        salary_id: Uuid,
        payload: ExplicitDeductionPayment,
    ) -> AppResult<SalaryPayment> {
        let salary = self.fetch_salary(salary_id).await?;
        tenants::require_tenant_access(actor, salary.admin_id)?;
        if payload.paid_amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("paid amount must be positive".into()));
        }
        if payload.advance_deduction < Decimal::ZERO {
            return Err(AppError::InvalidInput("deduction cannot be negative".into()));
        }
        let gross = round_money(payload.paid_amount);
        let deduction = round_money(payload.advance_deduction);
        let net = clamp_non_negative(gross - deduction);

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE salaries
            SET status = 'paid',
                paid_amount = $2,
                paid_date = NOW(),
                paid_by_id = $3,
                advance_deduction = $4,
                updated_at = NOW()
            WHERE id = $1 AND status <> 'paid'
            "#,
        )
        .bind(salary_id)
        .bind(net)
        .bind(actor.user_id)
        .bind(deduction)
        .execute(&mut tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::InvalidState("salary already paid".into()));
        }

        let payment = sqlx::query_as::<_, SalaryPayment>(
            r#"
            INSERT INTO salary_payments (id, admin_id, teacher_id, salary_id, gross_amount, advance_deduction, net_amount, currency, paid_date, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NULL)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(salary.admin_id)
        .bind(salary.teacher_id)
        .bind(salary_id)
        .bind(gross)
        .bind(deduction)
        .bind(net)
        .bind(&salary.currency)
        .fetch_one(&mut tx)
        .await?;

        if deduction > Decimal::ZERO {
            let oldest = sqlx::query_as::<_, SalaryAdvance>(
                r#"
                SELECT * FROM salary_advances
                WHERE teacher_id = $1 AND admin_id = $2 AND status = 'active'
                ORDER BY issued_at ASC
                LIMIT 1
                FOR UPDATE
                "#,
            )
            .bind(salary.teacher_id)
            .bind(salary.admin_id)
            .fetch_optional(&mut tx)
            .await?;

            if let Some(advance) = oldest {
                let applied = round_money(deduction.min(advance.balance));
                sqlx::query(
                    r#"
                    INSERT INTO salary_advance_repayments (id, advance_id, salary_payment_id, amount, repaid_at)
                    VALUES ($1, $2, $3, $4, NOW())
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(advance.id)
                .bind(payment.id)
                .bind(applied)
                .execute(&mut tx)
                .await?;
                sqlx::query(
                    r#"
                    UPDATE salary_advances
                    SET balance = balance - $2,
                        total_repaid = total_repaid + $2,
                        status = CASE WHEN balance - $2 <= 0 THEN 'completed' ELSE status END
                    WHERE id = $1
                    "#,
                )
                .bind(advance.id)
                .bind(applied)
                .execute(&mut tx)
                .await?;
                if advance.balance - applied <= Decimal::ZERO {
                    notifications::enqueue(
                        &mut tx,
                        NotificationKind::SalaryAdvanceRepaid,
                        "Salary advance repaid",
                        "Your salary advance has been fully repaid",
                        actor.user_id,
                        salary.teacher_id,
                    )
                    .await?;
                }
            }
        }

        notifications::enqueue(
            &mut tx,
            NotificationKind::SalaryPaid,
            "Salary paid",
            &format!(
                "A salary payment of {} {} was recorded ({} deducted for advances)",
                net, salary.currency, deduction
            ),
            actor.user_id,
            salary.teacher_id,
        )
        .await?;

        tx.commit().await?;
        Ok(payment)
    }

    async fn fetch_salary(&self, salary_id: Uuid) -> AppResult<Salary> {
        sqlx::query_as::<_, Salary>("SELECT * FROM salaries WHERE id = $1")
            .bind(salary_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn fetch_advance(&self, advance_id: Uuid) -> AppResult<SalaryAdvance> {
        sqlx::query_as::<_, SalaryAdvance>("SELECT * FROM salary_advances WHERE id = $1")
            .bind(advance_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Admins act on their own teachers; developers act for whichever tenant
    /// the teacher belongs to. Everyone else is rejected.
    async fn resolve_admin(
        &self,
        actor: &AuthUser,
        explicit: Option<i32>,
        teacher_id: i32,
    ) -> AppResult<i32> {
        match actor.role {
            Role::Admin => {
                tenants::tenant_user(&self.pool, actor.user_id, teacher_id, Role::Teacher).await?;
                Ok(actor.user_id)
            }
            Role::Developer => {
                if let Some(admin_id) = explicit {
                    return Ok(admin_id);
                }
                let admin_id = sqlx::query_scalar::<_, Option<i32>>(
                    "SELECT admin_id FROM users WHERE id = $1 AND role = 'teacher'",
                )
                .bind(teacher_id)
                .fetch_optional(&self.pool)
                .await?
                .flatten();
                admin_id.ok_or(AppError::NotFound)
            }
            _ => Err(AppError::Forbidden),
        }
    }
}

// keeps the planner honest without a database
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn advance(installment: &str, balance: &str) -> SalaryAdvance {
        SalaryAdvance {
            id: Uuid::new_v4(),
            admin_id: 1,
            teacher_id: 2,
            requested_amount: None,
            principal: dec(balance),
            balance: dec(balance),
            installments: 3,
            installment_amount: dec(installment),
            total_repaid: Decimal::ZERO,
            currency: "USD".into(),
            status: "active".into(),
            issued_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn deducts_one_installment_per_advance() {
        let advances = vec![advance("100", "300"), advance("50", "200")];
        let (plan, total) = plan_amortization(&advances);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].amount, dec("100"));
        assert_eq!(plan[1].amount, dec("50"));
        assert_eq!(total, dec("150"));
        assert!(!plan[0].completes);
    }

    #[test]
    fn final_installment_clamps_to_balance_and_completes() {
        let advances = vec![advance("100", "40")];
        let (plan, total) = plan_amortization(&advances);
        assert_eq!(plan[0].amount, dec("40.00"));
        assert!(plan[0].completes);
        assert_eq!(total, dec("40.00"));
    }

    #[test]
    fn fifo_order_is_preserved() {
        let first = advance("100", "300");
        let second = advance("100", "300");
        let advances = vec![first, second];
        let (plan, _) = plan_amortization(&advances);
        assert_eq!(plan[0].advance_id, advances[0].id);
        assert_eq!(plan[1].advance_id, advances[1].id);
    }

    #[test]
    fn drained_advance_only_flags_completion() {
        let mut spent = advance("100", "0");
        spent.balance = Decimal::ZERO;
        let (plan, total) = plan_amortization(&[spent]);
        assert_eq!(plan[0].amount, Decimal::ZERO);
        assert!(plan[0].completes);
        assert_eq!(total, Decimal::ZERO);
    }
}
