use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extractor::AuthUser;

use super::models::{
    ApproveAdvance, ExplicitDeductionPayment, IssueAdvance, NewSalary, RecordSalaryPayment,
    RequestAdvance, Salary, SalaryAdvance, SalaryPayment, UpdateSalary,
};
use super::service::SalaryService;

/// key: salary-api -> rest endpoints
pub async fn create_salary(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Json(payload): Json<NewSalary>,
) -> AppResult<(StatusCode, Json<Salary>)> {
    let salary = SalaryService::new(pool).create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(salary)))
}

pub async fn list_salaries(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
) -> AppResult<Json<Vec<Salary>>> {
    let salaries = SalaryService::new(pool).list(&actor).await?;
    Ok(Json(salaries))
}

pub async fn update_salary(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(salary_id): Path<Uuid>,
    Json(payload): Json<UpdateSalary>,
) -> AppResult<Json<Salary>> {
    let salary = SalaryService::new(pool)
        .update(&actor, salary_id, payload)
        .await?;
    Ok(Json(salary))
}

pub async fn record_salary_payment(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Json(payload): Json<RecordSalaryPayment>,
) -> AppResult<(StatusCode, Json<SalaryPayment>)> {
    let payment = SalaryService::new(pool)
        .record_payment(&actor, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn pay_salary_with_deduction(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(salary_id): Path<Uuid>,
    Json(payload): Json<ExplicitDeductionPayment>,
) -> AppResult<(StatusCode, Json<SalaryPayment>)> {
    let payment = SalaryService::new(pool)
        .pay_with_explicit_deduction(&actor, salary_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn request_advance(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Json(payload): Json<RequestAdvance>,
) -> AppResult<(StatusCode, Json<SalaryAdvance>)> {
    let advance = SalaryService::new(pool)
        .request_advance(&actor, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(advance)))
}

pub async fn issue_advance(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Json(payload): Json<IssueAdvance>,
) -> AppResult<(StatusCode, Json<SalaryAdvance>)> {
    let advance = SalaryService::new(pool).issue_advance(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(advance)))
}

pub async fn approve_advance(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(advance_id): Path<Uuid>,
    Json(payload): Json<ApproveAdvance>,
) -> AppResult<Json<SalaryAdvance>> {
    let advance = SalaryService::new(pool)
        .approve_advance(&actor, advance_id, payload)
        .await?;
    Ok(Json(advance))
}

pub async fn reject_advance(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(advance_id): Path<Uuid>,
) -> AppResult<Json<SalaryAdvance>> {
    let advance = SalaryService::new(pool)
        .reject_advance(&actor, advance_id)
        .await?;
    Ok(Json(advance))
}

pub async fn cancel_advance(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(advance_id): Path<Uuid>,
) -> AppResult<Json<SalaryAdvance>> {
    let advance = SalaryService::new(pool)
        .cancel_advance(&actor, advance_id)
        .await?;
    Ok(Json(advance))
}

pub async fn list_advances(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
) -> AppResult<Json<Vec<SalaryAdvance>>> {
    let advances = SalaryService::new(pool).list_advances(&actor).await?;
    Ok(Json(advances))
}
