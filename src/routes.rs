use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::{auth, fees, salaries, scheduler, subscriptions};

pub fn api_routes() -> Router {
    Router::new()
        .route("/api/login", post(auth::login_user))
        .route("/api/logout", post(auth::logout_user))
        .route("/api/me", get(auth::current_user))
        .route(
            "/api/fees",
            get(fees::api::list_fees).post(fees::api::create_fee),
        )
        .route(
            "/api/fee-definitions",
            get(fees::api::list_fee_definitions).post(fees::api::create_fee_definition),
        )
        .route(
            "/api/fee-definitions/:id",
            delete(fees::api::deactivate_fee_definition),
        )
        .route("/api/fees/:id/pay", post(fees::api::submit_fee_payment))
        .route("/api/fees/:id/verify", post(fees::api::verify_fee_payment))
        .route("/api/fees/:id/revert", post(fees::api::revert_fee_payment))
        .route(
            "/api/fees/:id",
            patch(fees::api::update_fee).delete(fees::api::delete_fee),
        )
        .route(
            "/api/salaries",
            get(salaries::api::list_salaries).post(salaries::api::create_salary),
        )
        .route("/api/salaries/:id", patch(salaries::api::update_salary))
        .route(
            "/api/salaries/payments",
            post(salaries::api::record_salary_payment),
        )
        .route(
            "/api/salaries/:id/pay",
            post(salaries::api::pay_salary_with_deduction),
        )
        .route(
            "/api/advances",
            get(salaries::api::list_advances).post(salaries::api::issue_advance),
        )
        .route("/api/advances/request", post(salaries::api::request_advance))
        .route(
            "/api/advances/:id/approve",
            post(salaries::api::approve_advance),
        )
        .route(
            "/api/advances/:id/reject",
            post(salaries::api::reject_advance),
        )
        .route(
            "/api/advances/:id",
            delete(salaries::api::cancel_advance),
        )
        .route(
            "/api/subscriptions",
            get(subscriptions::api::list_subscriptions)
                .post(subscriptions::api::create_subscription),
        )
        .route(
            "/api/subscriptions/:id/pay",
            post(subscriptions::api::submit_subscription_payment)
                .patch(subscriptions::api::edit_subscription_payment)
                .delete(subscriptions::api::clear_subscription_payment),
        )
        .route(
            "/api/subscriptions/:id/verify",
            post(subscriptions::api::verify_subscription),
        )
        .route(
            "/api/subscriptions/extend/:admin_id",
            post(subscriptions::api::extend_subscription),
        )
        .route(
            "/api/renewals",
            get(subscriptions::api::list_renewals).post(subscriptions::api::submit_renewal),
        )
        .route(
            "/api/renewals/:id/process",
            post(subscriptions::api::process_renewal),
        )
        .route("/api/batch/generate-fees", post(scheduler::run_generate_fees))
        .route(
            "/api/batch/generate-salaries",
            post(scheduler::run_generate_salaries),
        )
        .route(
            "/api/batch/scan-reminders",
            post(scheduler::run_scan_reminders),
        )
}
