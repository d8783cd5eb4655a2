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
    ExtendSubscription, NewSubscription, ProcessRenewal, SubmitRenewal,
    SubmitSubscriptionPayment, Subscription, SubscriptionRenewal, VerifySubscription,
};
use super::service::SubscriptionService;

/// key: subscription-api -> rest endpoints
pub async fn create_subscription(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Json(payload): Json<NewSubscription>,
) -> AppResult<(StatusCode, Json<Subscription>)> {
    let subscription = SubscriptionService::new(pool).create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn list_subscriptions(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
) -> AppResult<Json<Vec<Subscription>>> {
    let subscriptions = SubscriptionService::new(pool).list(&actor).await?;
    Ok(Json(subscriptions))
}

pub async fn submit_subscription_payment(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<SubmitSubscriptionPayment>,
) -> AppResult<Json<Subscription>> {
    let subscription = SubscriptionService::new(pool)
        .submit_payment(&actor, subscription_id, payload)
        .await?;
    Ok(Json(subscription))
}

pub async fn edit_subscription_payment(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<SubmitSubscriptionPayment>,
) -> AppResult<Json<Subscription>> {
    let subscription = SubscriptionService::new(pool)
        .edit_submitted_payment(&actor, subscription_id, payload)
        .await?;
    Ok(Json(subscription))
}

pub async fn clear_subscription_payment(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> AppResult<Json<Subscription>> {
    let subscription = SubscriptionService::new(pool)
        .clear_submitted_payment(&actor, subscription_id)
        .await?;
    Ok(Json(subscription))
}

pub async fn verify_subscription(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<VerifySubscription>,
) -> AppResult<Json<Subscription>> {
    let subscription = SubscriptionService::new(pool)
        .verify(&actor, subscription_id, payload)
        .await?;
    Ok(Json(subscription))
}

pub async fn extend_subscription(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(admin_id): Path<i32>,
    Json(payload): Json<ExtendSubscription>,
) -> AppResult<Json<Subscription>> {
    let subscription = SubscriptionService::new(pool)
        .extend(&actor, admin_id, payload)
        .await?;
    Ok(Json(subscription))
}

pub async fn submit_renewal(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Json(payload): Json<SubmitRenewal>,
) -> AppResult<(StatusCode, Json<SubscriptionRenewal>)> {
    let renewal = SubscriptionService::new(pool)
        .submit_renewal(&actor, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(renewal)))
}

pub async fn process_renewal(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
    Path(renewal_id): Path<Uuid>,
    Json(payload): Json<ProcessRenewal>,
) -> AppResult<Json<SubscriptionRenewal>> {
    let renewal = SubscriptionService::new(pool)
        .process_renewal(&actor, renewal_id, payload)
        .await?;
    Ok(Json(renewal))
}

pub async fn list_renewals(
    Extension(pool): Extension<PgPool>,
    actor: AuthUser,
) -> AppResult<Json<Vec<SubscriptionRenewal>>> {
    let renewals = SubscriptionService::new(pool).list_renewals(&actor).await?;
    Ok(Json(renewals))
}
