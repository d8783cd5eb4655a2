use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, FromRow, PgPool, Postgres};
use std::sync::Arc;
use tokio::time::{self, Duration as TokioDuration};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config;

/// Notification kinds fanned out by obligation state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    FeeDue,
    PaymentProcessing,
    PaymentVerified,
    SalaryPaid,
    SalaryAdvanceApproved,
    SalaryAdvanceRepaid,
    SubscriptionDue,
    SubscriptionPaid,
    ProgressUpdate,
    SystemAlert,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::FeeDue => "fee_due",
            NotificationKind::PaymentProcessing => "payment_processing",
            NotificationKind::PaymentVerified => "payment_verified",
            NotificationKind::SalaryPaid => "salary_paid",
            NotificationKind::SalaryAdvanceApproved => "salary_advance_approved",
            NotificationKind::SalaryAdvanceRepaid => "salary_advance_repaid",
            NotificationKind::SubscriptionDue => "subscription_due",
            NotificationKind::SubscriptionPaid => "subscription_paid",
            NotificationKind::ProgressUpdate => "progress_update",
            NotificationKind::SystemAlert => "system_alert",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

/// Writes a notification-intent row. Callers inside a financial transaction pass
/// `&mut *tx` so the intent commits (or rolls back) with the mutation; delivery
/// happens later via the dispatcher.
pub async fn enqueue<'c, E>(
    executor: E,
    kind: NotificationKind,
    title: &str,
    message: &str,
    sender_id: i32,
    receiver_id: i32,
) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO notifications (id, kind, title, message, sender_id, receiver_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(kind.as_str())
    .bind(title)
    .bind(message)
    .bind(sender_id)
    .bind(receiver_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// key: notification-sink -> delivery integration
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Default sink: structured log line per delivery. Real transports (mail, push)
/// slot in behind the same trait.
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        info!(
            kind = %notification.kind,
            receiver = notification.receiver_id,
            title = %notification.title,
            "notification delivered"
        );
        Ok(())
    }
}

/// key: notification-dispatcher -> outbox drain loop
pub fn spawn_dispatcher(pool: PgPool, sink: Arc<dyn NotificationSink>) {
    let interval = TokioDuration::from_secs(*config::NOTIFICATION_DISPATCH_INTERVAL_SECS);
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = dispatch_pending(&pool, sink.as_ref()).await {
                warn!(?err, "notification dispatch tick failed");
            }
        }
    });
}

/// Drains undelivered rows. A sink failure leaves `dispatched_at` NULL so the row
/// is retried on the next tick (at-least-once delivery).
pub async fn dispatch_pending(pool: &PgPool, sink: &dyn NotificationSink) -> anyhow::Result<usize> {
    let pending = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE dispatched_at IS NULL ORDER BY created_at ASC LIMIT 100",
    )
    .fetch_all(pool)
    .await?;

    let mut delivered = 0;
    for notification in pending {
        match sink.deliver(&notification).await {
            Ok(()) => {
                sqlx::query("UPDATE notifications SET dispatched_at = NOW() WHERE id = $1")
                    .bind(notification.id)
                    .execute(pool)
                    .await?;
                delivered += 1;
            }
            Err(err) => {
                warn!(
                    ?err,
                    id = %notification.id,
                    kind = %notification.kind,
                    "notification delivery failed; will retry"
                );
            }
        }
    }
    Ok(delivered)
}
