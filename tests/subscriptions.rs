mod common;

use academy_backend::subscriptions::models::{
    ExtendSubscription, NewSubscription, ProcessRenewal, SubmitRenewal,
    SubmitSubscriptionPayment, VerifySubscription,
};
use academy_backend::subscriptions::SubscriptionService;
use academy_backend::AppError;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn submission(amount: &str) -> SubmitSubscriptionPayment {
    SubmitSubscriptionPayment {
        amount: dec(amount),
        payment_details: Some("wire".into()),
        payment_proof: Some("receipt.pdf".into()),
    }
}

// key: subscription-tests -> lifecycle + processing window
#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn subscription_submit_verify_activates(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let developer_id = common::insert_user(&pool, "dev@platform.test", "developer", None).await;
    let admin_id = common::insert_user(&pool, "admin@academy.test", "admin", None).await;

    let service = SubscriptionService::new(pool.clone());
    let subscription = service
        .create(
            &common::developer(developer_id),
            NewSubscription {
                admin_id,
                plan: "monthly".into(),
                amount: dec("49.99"),
                currency: "USD".into(),
                start_date: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(subscription.status, "pending");
    assert!(subscription.end_date.is_some());

    let processing = service
        .submit_payment(&common::admin(admin_id), subscription.id, submission("49.99"))
        .await
        .unwrap();
    assert_eq!(processing.status, "processing");

    // submission fanned out to the developer
    let dev_notes: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE receiver_id = $1")
            .bind(developer_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(dev_notes, 1);

    let active = service
        .verify(
            &common::developer(developer_id),
            subscription.id,
            VerifySubscription { approved: true },
        )
        .await
        .unwrap();
    assert_eq!(active.status, "active");
    assert!(active.processed_date.is_some());

    // a second submit against the now-paid active subscription is refused
    let err = service
        .submit_payment(&common::admin(admin_id), subscription.id, submission("49.99"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn rejected_verification_returns_to_pending(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let developer_id = common::insert_user(&pool, "dev@platform.test", "developer", None).await;
    let admin_id = common::insert_user(&pool, "admin@academy.test", "admin", None).await;

    let service = SubscriptionService::new(pool.clone());
    let subscription = service
        .create(
            &common::developer(developer_id),
            NewSubscription {
                admin_id,
                plan: "yearly".into(),
                amount: dec("500"),
                currency: "USD".into(),
                start_date: None,
            },
        )
        .await
        .unwrap();
    service
        .submit_payment(&common::admin(admin_id), subscription.id, submission("500"))
        .await
        .unwrap();

    let rejected = service
        .verify(
            &common::developer(developer_id),
            subscription.id,
            VerifySubscription { approved: false },
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, "pending");
    // payment evidence is kept for resubmission
    assert!(rejected.paid_amount.is_some());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn payment_edit_window_closes_after_seven_days(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let developer_id = common::insert_user(&pool, "dev@platform.test", "developer", None).await;
    let admin_id = common::insert_user(&pool, "admin@academy.test", "admin", None).await;

    let service = SubscriptionService::new(pool.clone());
    let subscription = service
        .create(
            &common::developer(developer_id),
            NewSubscription {
                admin_id,
                plan: "monthly".into(),
                amount: dec("49.99"),
                currency: "USD".into(),
                start_date: None,
            },
        )
        .await
        .unwrap();
    service
        .submit_payment(&common::admin(admin_id), subscription.id, submission("49.99"))
        .await
        .unwrap();

    sqlx::query("UPDATE subscriptions SET paid_date = NOW() - INTERVAL '6 days' WHERE id = $1")
        .bind(subscription.id)
        .execute(&pool)
        .await
        .unwrap();
    let edited = service
        .edit_submitted_payment(&common::admin(admin_id), subscription.id, submission("59.99"))
        .await
        .unwrap();
    assert_eq!(edited.paid_amount, Some(dec("59.99")));

    sqlx::query("UPDATE subscriptions SET paid_date = NOW() - INTERVAL '8 days' WHERE id = $1")
        .bind(subscription.id)
        .execute(&pool)
        .await
        .unwrap();
    let err = service
        .edit_submitted_payment(&common::admin(admin_id), subscription.id, submission("69.99"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    let err = service
        .clear_submitted_payment(&common::admin(admin_id), subscription.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn extension_is_calendar_aware_from_current_expiry(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let developer_id = common::insert_user(&pool, "dev@platform.test", "developer", None).await;
    let admin_id = common::insert_user(&pool, "admin@academy.test", "admin", None).await;

    let service = SubscriptionService::new(pool.clone());
    let subscription = service
        .create(
            &common::developer(developer_id),
            NewSubscription {
                admin_id,
                plan: "monthly".into(),
                amount: dec("49.99"),
                currency: "USD".into(),
                start_date: None,
            },
        )
        .await
        .unwrap();
    let jan31 = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).single().unwrap();
    sqlx::query("UPDATE subscriptions SET status = 'active', end_date = $2 WHERE id = $1")
        .bind(subscription.id)
        .bind(jan31)
        .execute(&pool)
        .await
        .unwrap();

    let extended = service
        .extend(
            &common::developer(developer_id),
            admin_id,
            ExtendSubscription {
                plan: "monthly".into(),
                amount: dec("49.99"),
                currency: "USD".into(),
            },
        )
        .await
        .unwrap();
    // Jan 31 + 1 calendar month clamps to the leap-year Feb 29
    assert_eq!(
        extended.end_date.unwrap().date_naive().to_string(),
        "2024-02-29"
    );

    let audit: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM subscription_payments WHERE subscription_id = $1",
    )
    .bind(subscription.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(audit, 1);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn processed_renewal_reactivates_only_non_payment_disables(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let developer_id = common::insert_user(&pool, "dev@platform.test", "developer", None).await;
    let admin_id = common::insert_user(&pool, "admin@academy.test", "admin", None).await;
    let teacher_id =
        common::insert_user(&pool, "teacher@academy.test", "teacher", Some(admin_id)).await;
    let student_id =
        common::insert_user(&pool, "student@academy.test", "student", Some(admin_id)).await;

    // tenant lapsed: admin and teacher auto-disabled, student manually disabled
    sqlx::query(
        "UPDATE users SET active = FALSE, disabled_for_non_payment = TRUE WHERE id IN ($1, $2)",
    )
    .bind(admin_id)
    .bind(teacher_id)
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("UPDATE users SET active = FALSE, manually_disabled = TRUE WHERE id = $1")
        .bind(student_id)
        .execute(&pool)
        .await
        .unwrap();

    let service = SubscriptionService::new(pool.clone());
    let renewal = service
        .submit_renewal(
            &common::admin(admin_id),
            SubmitRenewal {
                plan: "monthly".into(),
                amount: dec("49.99"),
                currency: "USD".into(),
                payment_details: Some("wire".into()),
                payment_proof: None,
            },
        )
        .await
        .unwrap();

    let processed = service
        .process_renewal(
            &common::developer(developer_id),
            renewal.id,
            ProcessRenewal { approved: true },
        )
        .await
        .unwrap();
    assert_eq!(processed.status, "processed");

    let active_flags: Vec<(i32, bool)> =
        sqlx::query_as("SELECT id, active FROM users WHERE id IN ($1, $2, $3) ORDER BY id")
            .bind(admin_id)
            .bind(teacher_id)
            .bind(student_id)
            .fetch_all(&pool)
            .await
            .unwrap();
    for (id, active) in active_flags {
        if id == student_id {
            // manual disables are never undone by a renewal
            assert!(!active);
        } else {
            assert!(active);
        }
    }

    // a second process attempt is refused
    let err = service
        .process_renewal(
            &common::developer(developer_id),
            renewal.id,
            ProcessRenewal { approved: true },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}
