mod common;

use academy_backend::fees::models::{NewFee, SubmitFeePayment};
use academy_backend::fees::FeeService;
use academy_backend::AppError;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

fn submit(amount: &str) -> SubmitFeePayment {
    SubmitFeePayment {
        amount: amount.parse().unwrap(),
        payment_details: Some("bank transfer".into()),
        payment_proof: Some("proof.png".into()),
    }
}

// key: fee-tests -> submit/verify/revert round trips
#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn fee_submit_verify_round_trip(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let admin_id = common::insert_user(&pool, "admin@academy.test", "admin", None).await;
    let student_id =
        common::insert_user(&pool, "student@academy.test", "student", Some(admin_id)).await;
    let parent_id =
        common::insert_user(&pool, "parent@academy.test", "parent", Some(admin_id)).await;
    common::link_parent(&pool, student_id, parent_id).await;

    let service = FeeService::new(pool.clone());
    let fee = service
        .create(
            &common::admin(admin_id),
            NewFee {
                admin_id: None,
                student_id,
                course_id: None,
                title: "Tuition".into(),
                amount: "150".parse().unwrap(),
                currency: "USD".into(),
                due_date: Utc::now() + Duration::days(14),
            },
        )
        .await
        .unwrap();
    assert_eq!(fee.status, "pending");

    // creation fanned out to the linked parent
    let parent_notes: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE receiver_id = $1 AND kind = 'fee_due'",
    )
    .bind(parent_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(parent_notes, 1);

    let processing = service
        .submit_payment(&common::student(student_id, admin_id), fee.id, submit("150"))
        .await
        .unwrap();
    assert_eq!(processing.status, "processing");
    assert_eq!(processing.paid_by_id, Some(student_id));

    let paid = service
        .verify(&common::admin(admin_id), fee.id)
        .await
        .unwrap();
    assert_eq!(paid.status, "paid");
    assert_eq!(paid.paid_amount, Some(Decimal::from(150)));
    assert!(paid.processed_date.is_some());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn fee_revert_clears_payment_and_double_revert_fails(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let admin_id = common::insert_user(&pool, "admin@academy.test", "admin", None).await;
    let student_id =
        common::insert_user(&pool, "student@academy.test", "student", Some(admin_id)).await;

    let service = FeeService::new(pool.clone());
    let fee = service
        .create(
            &common::admin(admin_id),
            NewFee {
                admin_id: None,
                student_id,
                course_id: None,
                title: "Tuition".into(),
                amount: "80".parse().unwrap(),
                currency: "USD".into(),
                due_date: Utc::now() + Duration::days(7),
            },
        )
        .await
        .unwrap();

    service
        .submit_payment(&common::student(student_id, admin_id), fee.id, submit("80"))
        .await
        .unwrap();

    let reverted = service
        .revert(&common::admin(admin_id), fee.id)
        .await
        .unwrap();
    assert_eq!(reverted.status, "pending");
    assert!(reverted.paid_amount.is_none());
    assert!(reverted.paid_date.is_none());
    assert!(reverted.payment_details.is_none());
    assert!(reverted.payment_proof.is_none());
    assert!(reverted.paid_by_id.is_none());

    let err = service
        .revert(&common::admin(admin_id), fee.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn fee_revert_outside_window_fails(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let admin_id = common::insert_user(&pool, "admin@academy.test", "admin", None).await;
    let student_id =
        common::insert_user(&pool, "student@academy.test", "student", Some(admin_id)).await;

    let service = FeeService::new(pool.clone());
    let fee = service
        .create(
            &common::admin(admin_id),
            NewFee {
                admin_id: None,
                student_id,
                course_id: None,
                title: "Tuition".into(),
                amount: "80".parse().unwrap(),
                currency: "USD".into(),
                due_date: Utc::now() + Duration::days(7),
            },
        )
        .await
        .unwrap();
    service
        .submit_payment(&common::student(student_id, admin_id), fee.id, submit("80"))
        .await
        .unwrap();

    sqlx::query("UPDATE fees SET paid_date = NOW() - INTERVAL '8 days' WHERE id = $1")
        .bind(fee.id)
        .execute(&pool)
        .await
        .unwrap();

    let err = service
        .revert(&common::admin(admin_id), fee.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn stranger_cannot_submit_fee_payment(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let admin_id = common::insert_user(&pool, "admin@academy.test", "admin", None).await;
    let student_id =
        common::insert_user(&pool, "student@academy.test", "student", Some(admin_id)).await;
    let other_id =
        common::insert_user(&pool, "other@academy.test", "student", Some(admin_id)).await;

    let service = FeeService::new(pool.clone());
    let fee = service
        .create(
            &common::admin(admin_id),
            NewFee {
                admin_id: None,
                student_id,
                course_id: None,
                title: "Tuition".into(),
                amount: "50".parse().unwrap(),
                currency: "USD".into(),
                due_date: Utc::now() + Duration::days(7),
            },
        )
        .await
        .unwrap();

    let err = service
        .submit_payment(&common::student(other_id, admin_id), fee.id, submit("50"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = service
        .verify(&common::admin(admin_id), fee.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn other_tenant_admin_sees_not_found(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let admin_id = common::insert_user(&pool, "admin@academy.test", "admin", None).await;
    let other_admin = common::insert_user(&pool, "rival@academy.test", "admin", None).await;
    let student_id =
        common::insert_user(&pool, "student@academy.test", "student", Some(admin_id)).await;

    let service = FeeService::new(pool.clone());
    let fee = service
        .create(
            &common::admin(admin_id),
            NewFee {
                admin_id: None,
                student_id,
                course_id: None,
                title: "Tuition".into(),
                amount: "50".parse().unwrap(),
                currency: "USD".into(),
                due_date: Utc::now() + Duration::days(7),
            },
        )
        .await
        .unwrap();
    service
        .submit_payment(&common::student(student_id, admin_id), fee.id, submit("50"))
        .await
        .unwrap();

    let err = service
        .verify(&common::admin(other_admin), fee.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}
