use chrono::{Duration, Utc};
use sqlx::SqlitePool;

pub async fn load(pool: &SqlitePool) {
    let yesterday = (Utc::now() - Duration::days(1)).to_rfc3339();

    let rows = [
        ("tg-1001", "active", Some(yesterday.clone())),
        ("tg-2002", "cancelled", Some(yesterday)),
        ("tg-3003", "past_due", Some("2099-01-01T00:00:00Z".to_string())),
        ("tg-4004", "canceled", None),
    ];

    for (owner, status, end) in rows {
        sqlx::query("INSERT INTO subscription (owner_identity, status, current_period_end) VALUES (?, ?, ?)")
            .bind(owner)
            .bind(status)
            .bind(end)
            .execute(pool)
            .await
            .unwrap();
    }
}
