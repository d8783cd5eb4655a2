use axum::{extract::Extension, http::HeaderMap, Json};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::time::{self, Duration as TokioDuration};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config;
use crate::error::{AppError, AppResult};
use crate::fees::models::FeeDefinition;
use crate::fees::FeeService;
use crate::notifications::{self, NotificationKind};
use crate::salaries::Salary;
use crate::tenants;

/// Outcome of one batch run. Per-item failures are collected, never fatal.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub created: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// key: scheduler -> periodic generation + reminders
pub fn spawn(pool: PgPool) {
    let interval = TokioDuration::from_secs(*config::SCHEDULER_SCAN_INTERVAL_SECS);
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            let now = Utc::now();
            if let Err(err) = process_tick(&pool, now).await {
                warn!(?err, "scheduler tick failed");
            }
        }
    });
}

/// One scheduler pass: expire lapsed subscriptions, materialize the month's
/// recurring fees and salaries, raise due-date reminders. Overlapping runs are
/// harmless; generation is idempotent per month.
pub async fn process_tick(pool: &PgPool, now: DateTime<Utc>) -> anyhow::Result<()> {
    let expired = expire_lapsed_subscriptions(pool, now).await?;
    if expired > 0 {
        info!(expired, "marked lapsed subscriptions expired");
    }
    let overdue = mark_overdue_salaries(pool, now).await?;
    if overdue > 0 {
        info!(overdue, "marked unpaid salaries overdue");
    }

    let fees = generate_monthly_fees(pool, now).await?;
    if !fees.errors.is_empty() {
        warn!(errors = ?fees.errors, "fee generation finished with item errors");
    }
    let salaries = generate_monthly_salaries(pool, now).await?;
    if !salaries.errors.is_empty() {
        warn!(errors = ?salaries.errors, "salary generation finished with item errors");
    }
    let reminders = scan_reminders(pool, now).await?;
    info!(
        fees_created = fees.created,
        salaries_created = salaries.created,
        reminders = reminders.created,
        "scheduler tick complete"
    );
    Ok(())
}

/// Active subscriptions whose expiry has passed lapse to expired. Lifetime
/// rows (NULL end_date) never lapse.
pub async fn expire_lapsed_subscriptions(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subscriptions
        SET status = 'expired', updated_at = NOW()
        WHERE status = 'active' AND end_date IS NOT NULL AND end_date < $1
        "#,
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Pending salaries whose due date has passed become overdue. Payment still
/// succeeds against an overdue salary.
pub async fn mark_overdue_salaries(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE salaries
        SET status = 'overdue', updated_at = NOW()
        WHERE status = 'pending' AND due_date < $1
        "#,
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Materializes this month's recurring fees from the standing definitions.
/// At most one fee per (student, course, month, year); a second run for the
/// same month creates nothing.
pub async fn generate_monthly_fees(pool: &PgPool, now: DateTime<Utc>) -> anyhow::Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    let month = now.month() as i32;
    let year = now.year();

    let definitions = sqlx::query_as::<_, FeeDefinition>(
        "SELECT * FROM fee_definitions WHERE active AND start_date <= $1",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;

    let service = FeeService::new(pool.clone());
    for definition in definitions {
        let due_date = match fee_due_date(&definition, year, month as u32) {
            Some(due) => due,
            None => {
                summary
                    .errors
                    .push(format!("definition {}: invalid due day", definition.id));
                continue;
            }
        };
        match service
            .create_from_definition(&definition, month, year, due_date)
            .await
        {
            Ok(true) => summary.created += 1,
            Ok(false) => summary.skipped += 1,
            Err(err) => summary
                .errors
                .push(format!("definition {}: {}", definition.id, err)),
        }
    }
    Ok(summary)
}

// Fixed monthly due day, unless the definition asks for generation-day +
// grace-days scheduling. A definition starting mid-month never yields a fee
// already past due: the due date floors at start_date.
fn fee_due_date(definition: &FeeDefinition, year: i32, month: u32) -> Option<DateTime<Utc>> {
    let due = if definition.due_after_days > 0 {
        date_at(year, month, definition.generation_day as u32)?
            + Duration::days(definition.due_after_days as i64)
    } else {
        date_at(year, month, *config::FEE_GENERATION_DUE_DAY)?
    };
    Some(due.max(definition.start_date))
}

fn date_at(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single()
}

/// Materializes this month's recurring salaries: each active teacher's most
/// recent recurring salary row serves as the standing pay configuration.
pub async fn generate_monthly_salaries(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> anyhow::Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    let month = now.month() as i32;
    let year = now.year();
    let due_date = match date_at(year, now.month(), *config::SALARY_GENERATION_DUE_DAY) {
        Some(due) => due,
        None => {
            summary.errors.push("invalid salary due day".into());
            return Ok(summary);
        }
    };

    let templates = sqlx::query_as::<_, Salary>(
        r#"
        SELECT DISTINCT ON (s.teacher_id) s.*
        FROM salaries s
        JOIN users u ON u.id = s.teacher_id
        WHERE s.is_recurring AND u.active
        ORDER BY s.teacher_id, s.year DESC NULLS LAST, s.month DESC NULLS LAST
        "#,
    )
    .fetch_all(pool)
    .await?;

    for template in templates {
        if template.month == Some(month) && template.year == Some(year) {
            summary.skipped += 1;
            continue;
        }
        match create_salary_instance(pool, &template, month, year, due_date).await {
            Ok(true) => summary.created += 1,
            Ok(false) => summary.skipped += 1,
            Err(err) => summary
                .errors
                .push(format!("teacher {}: {}", template.teacher_id, err)),
        }
    }
    Ok(summary)
}

async fn create_salary_instance(
    pool: &PgPool,
    template: &Salary,
    month: i32,
    year: i32,
    due_date: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM salaries WHERE teacher_id = $1 AND month = $2 AND year = $3 AND is_recurring",
    )
    .bind(template.teacher_id)
    .bind(month)
    .bind(year)
    .fetch_one(pool)
    .await?;
    if existing > 0 {
        return Ok(false);
    }

    let mut tx = pool.begin().await?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO salaries (id, admin_id, teacher_id, amount, currency, due_date, month, year, is_recurring, pay_type, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, 'pending')
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(template.admin_id)
    .bind(template.teacher_id)
    .bind(template.amount)
    .bind(&template.currency)
    .bind(due_date)
    .bind(month)
    .bind(year)
    .bind(&template.pay_type)
    .execute(&mut tx)
    .await?;
    if inserted.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    notifications::enqueue(
        &mut tx,
        NotificationKind::SystemAlert,
        "Salary due",
        &format!(
            "A salary of {} {} for {}/{} falls due on {}",
            template.amount,
            template.currency,
            month,
            year,
            due_date.date_naive()
        ),
        template.teacher_id,
        template.admin_id,
    )
    .await?;
    tx.commit().await?;
    Ok(true)
}

/// Inclusive upper bound of the reminder look-ahead: due in exactly
/// `window_days` days is in, one day later is out. `scan_reminders` binds this
/// same bound in its queries.
fn reminder_window_end(now: DateTime<Utc>, window_days: i64) -> DateTime<Utc> {
    now + Duration::days(window_days)
}

#[cfg(test)]
fn within_reminder_window(due: DateTime<Utc>, now: DateTime<Utc>, window_days: i64) -> bool {
    due >= now && due <= reminder_window_end(now, window_days)
}

/// Raises one reminder per parent for fees falling due inside the window, and
/// one per tenant admin for expiring subscriptions. Lifetime subscriptions are
/// never due.
pub async fn scan_reminders(pool: &PgPool, now: DateTime<Utc>) -> anyhow::Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    let window_end = reminder_window_end(now, *config::REMINDER_WINDOW_DAYS);

    let due_fees = sqlx::query_as::<_, crate::fees::Fee>(
        "SELECT * FROM fees WHERE status = 'pending' AND due_date >= $1 AND due_date <= $2",
    )
    .bind(now)
    .bind(window_end)
    .fetch_all(pool)
    .await?;

    for fee in due_fees {
        let parents = match tenants::parent_ids(pool, fee.student_id).await {
            Ok(parents) => parents,
            Err(err) => {
                summary.errors.push(format!("fee {}: {}", fee.id, err));
                continue;
            }
        };
        for parent_id in parents {
            let result = notifications::enqueue(
                pool,
                NotificationKind::FeeDue,
                "Fee due soon",
                &format!(
                    "The fee \"{}\" of {} {} is due on {}",
                    fee.title,
                    fee.amount,
                    fee.currency,
                    fee.due_date.date_naive()
                ),
                fee.admin_id,
                parent_id,
            )
            .await;
            match result {
                Ok(()) => summary.created += 1,
                Err(err) => summary.errors.push(format!("fee {}: {}", fee.id, err)),
            }
        }
    }

    let expiring = sqlx::query_as::<_, crate::subscriptions::Subscription>(
        r#"
        SELECT * FROM subscriptions
        WHERE status = 'active' AND end_date IS NOT NULL AND end_date >= $1 AND end_date <= $2
        "#,
    )
    .bind(now)
    .bind(window_end)
    .fetch_all(pool)
    .await?;

    for subscription in expiring {
        let end = match subscription.end_date {
            Some(end) => end,
            None => continue,
        };
        let result = notifications::enqueue(
            pool,
            NotificationKind::SubscriptionDue,
            "Subscription expiring",
            &format!("Your subscription expires on {}", end.date_naive()),
            subscription.admin_id,
            subscription.admin_id,
        )
        .await;
        match result {
            Ok(()) => summary.created += 1,
            Err(err) => summary
                .errors
                .push(format!("subscription {}: {}", subscription.id, err)),
        }
    }
    Ok(summary)
}

fn require_batch_token(headers: &HeaderMap) -> AppResult<()> {
    let token = headers
        .get("x-batch-token")
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    if token != config::BATCH_SHARED_SECRET.as_str() {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// key: batch-api -> externally triggered runs
pub async fn run_generate_fees(
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
) -> AppResult<Json<BatchSummary>> {
    require_batch_token(&headers)?;
    let summary = generate_monthly_fees(&pool, Utc::now())
        .await
        .map_err(|err| AppError::Message(err.to_string()))?;
    Ok(Json(summary))
}

pub async fn run_generate_salaries(
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
) -> AppResult<Json<BatchSummary>> {
    require_batch_token(&headers)?;
    let summary = generate_monthly_salaries(&pool, Utc::now())
        .await
        .map_err(|err| AppError::Message(err.to_string()))?;
    Ok(Json(summary))
}

pub async fn run_scan_reminders(
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
) -> AppResult<Json<BatchSummary>> {
    require_batch_token(&headers)?;
    let summary = scan_reminders(&pool, Utc::now())
        .await
        .map_err(|err| AppError::Message(err.to_string()))?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single().unwrap()
    }

    #[test]
    fn due_in_exactly_seven_days_is_inside_window() {
        let now = at(2024, 5, 1);
        assert!(within_reminder_window(now + Duration::days(7), now, 7));
    }

    #[test]
    fn due_in_eight_days_is_outside_window() {
        let now = at(2024, 5, 1);
        assert!(!within_reminder_window(now + Duration::days(8), now, 7));
    }

    fn definition(start: DateTime<Utc>, due_after_days: i32) -> FeeDefinition {
        FeeDefinition {
            id: Uuid::new_v4(),
            admin_id: 1,
            student_id: 2,
            course_id: None,
            title: "Tuition".into(),
            amount: rust_decimal::Decimal::from(100),
            currency: "USD".into(),
            generation_day: 1,
            start_date: start,
            due_after_days,
            active: true,
            created_at: start,
        }
    }

    #[test]
    fn generated_due_date_floors_at_definition_start() {
        // fixed due day 5, definition only starts on the 20th
        let start = at(2024, 5, 20);
        let due = fee_due_date(&definition(start, 0), 2024, 5).unwrap();
        assert_eq!(due, start);
    }

    #[test]
    fn generated_due_date_uses_grace_days_when_past_start() {
        let start = at(2024, 1, 1);
        let due = fee_due_date(&definition(start, 10), 2024, 5).unwrap();
        assert_eq!(due, at(2024, 5, 11));
    }

    #[test]
    fn past_due_is_outside_window() {
        let now = at(2024, 5, 1);
        assert!(!within_reminder_window(now - Duration::days(1), now, 7));
    }
}
