pub mod instances;
pub mod subscriptions;

use sqlx::SqlitePool;

pub async fn load_all_fixtures(pool: &SqlitePool) {
    instances::load(pool).await;
    subscriptions::load(pool).await;
}
