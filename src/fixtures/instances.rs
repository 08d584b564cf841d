use sqlx::SqlitePool;

pub async fn load(pool: &SqlitePool) {
    let rows = [
        // Paying owner
        ("inst-1001", "tg-1001", Some("c-1001"), "running", r#"{"EXCHANGE_API_KEY":"k-1001"}"#),
        // Cancelled owner, one live instance and an older stopped one
        ("inst-2002", "tg-2002", Some("c-2002"), "running", r#"{"EXCHANGE_API_KEY":"k-2002"}"#),
        ("inst-2003", "tg-2002", None, "stopped", "{}"),
        // Past due but still inside the paid period
        ("inst-3003", "tg-3003", Some("c-3003"), "running", "{}"),
        // Cancelled without a period end, still booting
        ("inst-4004", "tg-4004", Some("c-4004"), "pending", "{}"),
    ];

    for (id, owner, container_id, status, secrets) in rows {
        sqlx::query(
            "INSERT INTO instance (id, owner_identity, container_id, status, model_name, secrets, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(id)
        .bind(owner)
        .bind(container_id)
        .bind(status)
        .bind("claude-sonnet")
        .bind(secrets)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await
        .unwrap();
    }
}
