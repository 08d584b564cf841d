use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Billing state of an owner. Written elsewhere, only read here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub(crate) struct Subscription {
    pub(crate) owner_identity: String,
    pub(crate) status: String,
    pub(crate) current_period_end: Option<String>,
}

impl Subscription {
    pub(crate) fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "active" | "pending")
    }

    /// Inactive and past the paid period (plus `grace`). A missing period
    /// end counts as past.
    pub(crate) fn is_lapsed(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        if self.is_active() {
            return false;
        }

        let end = match &self.current_period_end {
            None => return true,
            Some(end) => end,
        };

        match DateTime::parse_from_rfc3339(end) {
            Ok(end) => end.with_timezone(&Utc) + grace <= now,
            Err(e) => {
                warn!("Subscription of {} has an unreadable period end {:?}: {}", self.owner_identity, end, e);
                false
            }
        }
    }
}

pub(crate) async fn find_inactive(pool: &SqlitePool) -> Result<Vec<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        "SELECT owner_identity, status, current_period_end FROM subscription
         WHERE status NOT IN ('active', 'pending')
         ORDER BY owner_identity"
    )
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_lapsed(pool: &SqlitePool, now: DateTime<Utc>, grace: Duration) -> Result<Vec<Subscription>, sqlx::Error> {
    Ok(find_inactive(pool)
        .await?
        .into_iter()
        .filter(|subscription| subscription.is_lapsed(now, grace))
        .collect())
}
