use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

use crate::runtime::types::{InstanceConfig, InstanceStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Instance {
    pub(crate) id: String,
    pub(crate) owner_identity: String,
    pub(crate) container_id: Option<String>,
    pub(crate) status: InstanceStatus,
    pub(crate) model_name: Option<String>,
    #[serde(skip_serializing, default)]
    pub(crate) secrets: BTreeMap<String, String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: Option<String>,
    pub(crate) stopped_at: Option<String>,
}

impl Instance {
    pub(crate) fn config(&self) -> InstanceConfig {
        InstanceConfig {
            instance_id: self.id.clone(),
            owner_identity: self.owner_identity.clone(),
            secrets: self.secrets.clone(),
            model_name: self.model_name.clone(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct InstanceRow {
    id: String,
    owner_identity: String,
    container_id: Option<String>,
    status: String,
    model_name: Option<String>,
    secrets: String,
    created_at: String,
    updated_at: Option<String>,
    stopped_at: Option<String>,
}

impl From<InstanceRow> for Instance {
    fn from(row: InstanceRow) -> Self {
        Instance {
            status: row.status.parse().unwrap_or_else(|e| {
                warn!("Instance {}: {}", row.id, e);
                InstanceStatus::Error
            }),
            secrets: serde_json::from_str(&row.secrets).unwrap_or_else(|e| {
                warn!("Instance {} has unreadable secrets, deploying without them: {}", row.id, e);
                BTreeMap::new()
            }),
            id: row.id,
            owner_identity: row.owner_identity,
            container_id: row.container_id,
            model_name: row.model_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
            stopped_at: row.stopped_at,
        }
    }
}

const SELECT_COLUMNS: &str = "
    id, owner_identity, container_id, status, model_name,
    secrets, created_at, updated_at, stopped_at
";

pub(crate) async fn find(pool: &SqlitePool, id: &str) -> Result<Option<Instance>, sqlx::Error> {
    let sql = format!("SELECT {} FROM instance WHERE id = ?", SELECT_COLUMNS);

    let row = sqlx::query_as::<_, InstanceRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Instance::from))
}

pub(crate) async fn find_by_container(pool: &SqlitePool, container_id: &str) -> Result<Option<Instance>, sqlx::Error> {
    let sql = format!("SELECT {} FROM instance WHERE container_id = ?", SELECT_COLUMNS);

    let row = sqlx::query_as::<_, InstanceRow>(&sql)
        .bind(container_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Instance::from))
}

/// Reverse lookup used when recreating a container from its id.
pub(crate) async fn config_for_container(pool: &SqlitePool, container_id: &str) -> Result<Option<InstanceConfig>, sqlx::Error> {
    Ok(find_by_container(pool, container_id).await?.map(|instance| instance.config()))
}

pub(crate) async fn find_by_owner_with_status(
    pool: &SqlitePool,
    owner_identity: &str,
    statuses: &[InstanceStatus],
) -> Result<Vec<Instance>, sqlx::Error> {
    if statuses.is_empty() {
        return Ok(vec![]);
    }

    let placeholders = statuses.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT {} FROM instance WHERE owner_identity = ? AND status IN({}) ORDER BY created_at",
        SELECT_COLUMNS,
        placeholders
    );

    let mut query = sqlx::query_as::<_, InstanceRow>(&sql).bind(owner_identity);
    for status in statuses {
        query = query.bind(status.to_string());
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows.into_iter().map(Instance::from).collect())
}

pub(crate) async fn find_all(pool: &SqlitePool) -> Result<Vec<Instance>, sqlx::Error> {
    let sql = format!("SELECT {} FROM instance ORDER BY created_at", SELECT_COLUMNS);

    let rows = sqlx::query_as::<_, InstanceRow>(&sql).fetch_all(pool).await?;
    Ok(rows.into_iter().map(Instance::from).collect())
}

pub(crate) async fn attach_container(
    pool: &SqlitePool,
    id: &str,
    container_id: &str,
    status: InstanceStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE instance SET container_id = ?, status = ?, updated_at = ?, stopped_at = NULL WHERE id = ?")
        .bind(container_id)
        .bind(status.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub(crate) async fn update_status(pool: &SqlitePool, id: &str, status: InstanceStatus) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE instance SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub(crate) async fn mark_stopped(pool: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query("UPDATE instance SET status = ?, updated_at = ?, stopped_at = ? WHERE id = ?")
        .bind(InstanceStatus::Stopped.to_string())
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory_pool;
    use crate::fixtures::load_all_fixtures;

    #[tokio::test]
    async fn test_find_decodes_secrets() {
        let pool = memory_pool().await;
        load_all_fixtures(&pool).await;

        let instance = find(&pool, "inst-1001").await.unwrap().unwrap();

        assert_eq!(instance.owner_identity, "tg-1001");
        assert_eq!(instance.status, InstanceStatus::Running);
        assert_eq!(instance.secrets.get("EXCHANGE_API_KEY").map(String::as_str), Some("k-1001"));
        assert!(find(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_secrets_decode_to_empty() {
        let pool = memory_pool().await;
        load_all_fixtures(&pool).await;
        sqlx::query("UPDATE instance SET secrets = '{not json' WHERE id = 'inst-1001'")
            .execute(&pool)
            .await
            .unwrap();

        let instance = find(&pool, "inst-1001").await.unwrap().unwrap();

        assert!(instance.secrets.is_empty());
        assert_eq!(instance.owner_identity, "tg-1001");
    }

    #[tokio::test]
    async fn test_secrets_are_not_serialized() {
        let pool = memory_pool().await;
        load_all_fixtures(&pool).await;

        let instance = find(&pool, "inst-1001").await.unwrap().unwrap();
        let json = serde_json::to_value(&instance).unwrap();

        assert!(json.get("secrets").is_none());
        assert_eq!(json["status"], "running");
    }

    #[tokio::test]
    async fn test_config_for_container() {
        let pool = memory_pool().await;
        load_all_fixtures(&pool).await;

        let config = config_for_container(&pool, "c-1001").await.unwrap().unwrap();
        assert_eq!(config.instance_id, "inst-1001");
        assert_eq!(config.model_name.as_deref(), Some("claude-sonnet"));

        assert!(config_for_container(&pool, "c-unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_owner_with_status() {
        let pool = memory_pool().await;
        load_all_fixtures(&pool).await;

        let live = find_by_owner_with_status(&pool, "tg-2002", &[InstanceStatus::Running, InstanceStatus::Pending])
            .await
            .unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, "inst-2002");

        assert!(find_by_owner_with_status(&pool, "tg-2002", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attach_then_mark_stopped() {
        let pool = memory_pool().await;
        load_all_fixtures(&pool).await;

        attach_container(&pool, "inst-1001", "c-new", InstanceStatus::Pending).await.unwrap();
        let attached = find(&pool, "inst-1001").await.unwrap().unwrap();
        assert_eq!(attached.container_id.as_deref(), Some("c-new"));
        assert_eq!(attached.status, InstanceStatus::Pending);

        mark_stopped(&pool, "inst-1001").await.unwrap();
        let stopped = find(&pool, "inst-1001").await.unwrap().unwrap();
        assert_eq!(stopped.status, InstanceStatus::Stopped);
        assert!(stopped.stopped_at.is_some());
    }
}
