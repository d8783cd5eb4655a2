use once_cell::sync::Lazy;

/// Secret used for JWT signing. Must be set via the `JWT_SECRET` env variable.
pub static JWT_SECRET: Lazy<String> =
    Lazy::new(|| std::env::var("JWT_SECRET").expect("JWT_SECRET must be set"));

/// Shared secret required by the batch endpoints (`x-batch-token` header).
/// Must be set via `BATCH_SHARED_SECRET`.
pub static BATCH_SHARED_SECRET: Lazy<String> =
    Lazy::new(|| std::env::var("BATCH_SHARED_SECRET").expect("BATCH_SHARED_SECRET must be set"));

/// Address the HTTP server should bind to. Defaults to `0.0.0.0`.
pub static BIND_ADDRESS: Lazy<String> =
    Lazy::new(|| std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()));

/// Port the HTTP server should listen on. Defaults to `3000`.
pub static BIND_PORT: Lazy<u16> = Lazy::new(|| {
    std::env::var("BIND_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000)
});

/// When set to a truthy value, allows the application to continue running even if database
/// migrations fail. Defaults to `false`.
pub static ALLOW_MIGRATION_FAILURE: Lazy<bool> = Lazy::new(|| {
    std::env::var("ALLOW_MIGRATION_FAILURE")
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes")
        })
        .unwrap_or(false)
});

/// key: scheduler-config -> recurring generation + reminder cadence
pub static SCHEDULER_SCAN_INTERVAL_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("SCHEDULER_SCAN_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(3600)
});

/// key: outbox-config -> notification dispatch cadence
pub static NOTIFICATION_DISPATCH_INTERVAL_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("NOTIFICATION_DISPATCH_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(30)
});

/// Look-ahead window for due-date reminders, in days. Defaults to 7.
pub static REMINDER_WINDOW_DAYS: Lazy<i64> = Lazy::new(|| {
    std::env::var("REMINDER_WINDOW_DAYS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(7)
});

/// Grace window during which a submitted-but-unverified payment may still be
/// edited, cleared, or reverted, in days. Defaults to 7.
pub static PAYMENT_EDIT_WINDOW_DAYS: Lazy<i64> = Lazy::new(|| {
    std::env::var("PAYMENT_EDIT_WINDOW_DAYS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(7)
});

/// Day of month recurring fees fall due. Defaults to the 5th.
pub static FEE_GENERATION_DUE_DAY: Lazy<u32> = Lazy::new(|| {
    std::env::var("FEE_GENERATION_DUE_DAY")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| (1..=28).contains(value))
        .unwrap_or(5)
});

/// Day of month recurring salaries fall due. Defaults to the 25th.
pub static SALARY_GENERATION_DUE_DAY: Lazy<u32> = Lazy::new(|| {
    std::env::var("SALARY_GENERATION_DUE_DAY")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| (1..=28).contains(value))
        .unwrap_or(25)
});
