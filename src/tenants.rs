use sqlx::{Executor, Postgres, Row};

use crate::error::{AppError, AppResult};
use crate::extractor::{AuthUser, Role};

/// Admins may only touch rows of their own tenant; developers see everything.
/// Out-of-scope rows surface as NotFound so existence does not leak.
pub fn require_tenant_access(actor: &AuthUser, row_admin_id: i32) -> AppResult<()> {
    match actor.role {
        Role::Developer => Ok(()),
        Role::Admin if actor.user_id == row_admin_id => Ok(()),
        Role::Admin => Err(AppError::NotFound),
        _ => Err(AppError::Forbidden),
    }
}

/// Ids of all parents linked to a student.
pub async fn parent_ids<'c, E>(executor: E, student_id: i32) -> Result<Vec<i32>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows = sqlx::query("SELECT parent_id FROM student_parents WHERE student_id = $1")
        .bind(student_id)
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().map(|r| r.get("parent_id")).collect())
}

/// Whether `user_id` is a parent of `student_id`.
pub async fn is_parent_of<'c, E>(
    executor: E,
    user_id: i32,
    student_id: i32,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let row = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM student_parents WHERE student_id = $1 AND parent_id = $2",
    )
    .bind(student_id)
    .bind(user_id)
    .fetch_one(executor)
    .await?;
    Ok(row > 0)
}

/// Ids of every platform developer, used for fan-out on subscription submissions.
pub async fn developer_ids<'c, E>(executor: E) -> Result<Vec<i32>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows = sqlx::query("SELECT id FROM users WHERE role = 'developer' AND active")
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().map(|r| r.get("id")).collect())
}

/// Fetches a user row belonging to the given tenant, verifying it has the
/// expected role. NotFound covers both absence and other-tenant rows.
pub async fn tenant_user<'c, E>(
    executor: E,
    admin_id: i32,
    user_id: i32,
    role: Role,
) -> AppResult<i32>
where
    E: Executor<'c, Database = Postgres>,
{
    let row = sqlx::query_scalar::<_, i32>(
        "SELECT id FROM users WHERE id = $1 AND admin_id = $2 AND role = $3",
    )
    .bind(user_id)
    .bind(admin_id)
    .bind(role.as_str())
    .fetch_optional(executor)
    .await?;
    row.ok_or(AppError::NotFound)
}

/// Re-activates a tenant admin and their managed users after a processed renewal,
/// but only those disabled specifically for non-payment. Manual disables stay put.
pub async fn reactivate_after_renewal<'c, E>(executor: E, admin_id: i32) -> Result<u64, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET active = TRUE, disabled_for_non_payment = FALSE
        WHERE (id = $1 OR admin_id = $1)
          AND disabled_for_non_payment
          AND NOT manually_disabled
        "#,
    )
    .bind(admin_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
