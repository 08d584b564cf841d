use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::env;

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS instance (
        id TEXT PRIMARY KEY NOT NULL,
        owner_identity TEXT NOT NULL,
        container_id TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        model_name TEXT,
        secrets TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT,
        stopped_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS instance_owner_identity ON instance (owner_identity)",
    "CREATE TABLE IF NOT EXISTS subscription (
        owner_identity TEXT PRIMARY KEY NOT NULL,
        status TEXT NOT NULL,
        current_period_end TEXT
    )",
];

pub(crate) async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

pub(crate) async fn init_database_connection() -> Result<SqlitePool, sqlx::Error> {
    let database_file_path = env::var("BOTYARD_DATABASE_PATH").unwrap_or_else(|_| "botyard.db".to_string());
    debug!("Open database {}", database_file_path);

    let options = SqliteConnectOptions::new()
        .filename(&database_file_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    create_schema(&pool).await.unwrap();
    pool
}
