use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extractor::AuthUser;

use super::models::{Fee, FeeDefinition, NewFee, NewFeeDefinition, SubmitFeePayment, UpdateFee};
use super::service::FeeService;

/// key: fee-api -> rest endpoints
pub async fn create_fee(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Json(payload): Json<NewFee>,
) -> AppResult<(StatusCode, Json<Fee>)> {
    let fee = FeeService::new(pool).create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(fee)))
}

pub async fn list_fees(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
) -> AppResult<Json<Vec<Fee>>> {
    let fees = FeeService::new(pool).list(&actor).await?;
    Ok(Json(fees))
}

pub async fn create_fee_definition(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Json(payload): Json<NewFeeDefinition>,
) -> AppResult<(StatusCode, Json<FeeDefinition>)> {
    let definition = FeeService::new(pool).create_definition(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(definition)))
}

pub async fn list_fee_definitions(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
) -> AppResult<Json<Vec<FeeDefinition>>> {
    let definitions = FeeService::new(pool).list_definitions(&actor).await?;
    Ok(Json(definitions))
}

pub async fn deactivate_fee_definition(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(definition_id): Path<Uuid>,
) -> AppResult<Json<FeeDefinition>> {
    let definition = FeeService::new(pool)
        .deactivate_definition(&actor, definition_id)
        .await?;
    Ok(Json(definition))
}

pub async fn submit_fee_payment(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(fee_id): Path<Uuid>,
    Json(payload): Json<SubmitFeePayment>,
) -> AppResult<Json<Fee>> {
    let fee = FeeService::new(pool)
        .submit_payment(&actor, fee_id, payload)
        .await?;
    Ok(Json(fee))
}

pub async fn verify_fee_payment(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(fee_id): Path<Uuid>,
) -> AppResult<Json<Fee>> {
    let fee = FeeService::new(pool).verify(&actor, fee_id).await?;
    Ok(Json(fee))
}

pub async fn revert_fee_payment(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(fee_id): Path<Uuid>,
) -> AppResult<Json<Fee>> {
    let fee = FeeService::new(pool).revert(&actor, fee_id).await?;
    Ok(Json(fee))
}

pub async fn update_fee(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(fee_id): Path<Uuid>,
    Json(payload): Json<UpdateFee>,
) -> AppResult<Json<Fee>> {
    let fee = FeeService::new(pool).update(&actor, fee_id, payload).await?;
    Ok(Json(fee))
}

pub async fn delete_fee(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(fee_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    FeeService::new(pool).delete(&actor, fee_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
