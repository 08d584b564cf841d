use sqlx::SqlitePool;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::config::Config;
use crate::models::instances;
use crate::runtime::error::RuntimeError;
use crate::runtime::image::{ImageBuilder, ImageSet};
use crate::runtime::manager::{CreatedInstance, InstanceManager, InstanceTemplate};
use crate::runtime::rollout::{rolling_update_all, UpdateOutcome, UpdateResult};
use crate::runtime::runtime::{ImageBackend, RuntimeInterface};
use crate::runtime::types::InstanceStatus;

#[derive(Debug)]
pub(crate) enum OrchestrationError {
    InstanceNotFound(String),
    Storage(sqlx::Error),
    Runtime(RuntimeError),
}

impl fmt::Display for OrchestrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestrationError::InstanceNotFound(id) => write!(f, "Instance {} not found", id),
            OrchestrationError::Storage(e) => write!(f, "Storage error: {}", e),
            OrchestrationError::Runtime(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for OrchestrationError {}

impl From<sqlx::Error> for OrchestrationError {
    fn from(err: sqlx::Error) -> Self {
        OrchestrationError::Storage(err)
    }
}

impl From<RuntimeError> for OrchestrationError {
    fn from(err: RuntimeError) -> Self {
        OrchestrationError::Runtime(err)
    }
}

/// Ties the runtime components to the instance records.
///
/// Deploys, rollouts and enforcement sweeps all take the same lock, so two of
/// them never act on one container at the same time.
pub(crate) struct Orchestrator {
    pub(crate) pool: SqlitePool,
    pub(crate) builder: Arc<ImageBuilder>,
    pub(crate) manager: Arc<InstanceManager>,
    lock: Mutex<()>,
}

impl Orchestrator {
    pub(crate) fn new(pool: SqlitePool, builder: Arc<ImageBuilder>, manager: Arc<InstanceManager>) -> Orchestrator {
        Orchestrator {
            pool,
            builder,
            manager,
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn from_config<R>(pool: SqlitePool, runtime: Arc<R>, config: &Config) -> Orchestrator
    where
        R: RuntimeInterface + ImageBackend + 'static,
    {
        let builder = ImageBuilder::new(runtime.clone(), ImageSet::from_settings(&config.images));
        let manager = InstanceManager::new(runtime, InstanceTemplate::from_config(config));

        Orchestrator::new(pool, Arc::new(builder), Arc::new(manager))
    }

    pub(crate) async fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Creates (or recreates) the container of an instance record.
    pub(crate) async fn deploy(&self, instance_id: &str) -> Result<CreatedInstance, OrchestrationError> {
        let instance = instances::find(&self.pool, instance_id)
            .await?
            .ok_or_else(|| OrchestrationError::InstanceNotFound(instance_id.to_string()))?;

        self.builder.ensure_images_ready().await?;

        let _guard = self.exclusive().await;

        match self.manager.create_instance(&instance.config()).await {
            Ok(created) => {
                instances::attach_container(&self.pool, &instance.id, &created.container_id, InstanceStatus::Pending).await?;
                Ok(created)
            }
            Err(e) => {
                error!("Deploy of instance {} failed: {}", instance.id, e);
                instances::update_status(&self.pool, &instance.id, InstanceStatus::Error).await?;
                Err(e.into())
            }
        }
    }

    /// Rolling update of the whole fleet, recording the new container ids.
    pub(crate) async fn rollout(&self) -> Result<Vec<UpdateResult>, OrchestrationError> {
        let _guard = self.exclusive().await;

        let pool = self.pool.clone();
        let results = rolling_update_all(&self.builder, &self.manager, |container_id| {
            let pool = pool.clone();
            async move { instances::config_for_container(&pool, &container_id).await }
        })
        .await?;

        for result in &results {
            if let UpdateOutcome::Updated { instance_id, new_container_id } = &result.outcome {
                if let Err(e) = instances::attach_container(&self.pool, instance_id, new_container_id, InstanceStatus::Pending).await {
                    error!("Cannot record container {} for instance {}: {}", new_container_id, instance_id, e);
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::memory_pool;
    use crate::fixtures::load_all_fixtures;
    use crate::runtime::fake::FakeRuntime;
    use crate::runtime::manager::test_template;
    use std::path::Path;
    use tempdir::TempDir;

    pub(crate) async fn test_orchestrator(runtime: Arc<FakeRuntime>, data_root: &Path) -> Orchestrator {
        let pool = memory_pool().await;
        load_all_fixtures(&pool).await;

        let builder = ImageBuilder::new(runtime.clone(), ImageSet::from_settings(&Config::default().images));
        let manager = InstanceManager::new(runtime, test_template(data_root));

        Orchestrator::new(pool, Arc::new(builder), Arc::new(manager))
    }

    #[tokio::test]
    async fn test_deploy_records_the_container() {
        let root = TempDir::new("botyard").unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        let orchestrator = test_orchestrator(runtime.clone(), root.path()).await;

        let created = orchestrator.deploy("inst-1001").await.unwrap();

        assert_eq!(created.container_name, "botyard-tg-1001");
        assert_eq!(runtime.builds().len(), 2);

        let instance = instances::find(&orchestrator.pool, "inst-1001").await.unwrap().unwrap();
        assert_eq!(instance.container_id, Some(created.container_id));
        assert_eq!(instance.status, InstanceStatus::Pending);
    }

    #[tokio::test]
    async fn test_deploy_unknown_instance() {
        let root = TempDir::new("botyard").unwrap();
        let orchestrator = test_orchestrator(Arc::new(FakeRuntime::new()), root.path()).await;

        let result = orchestrator.deploy("inst-0000").await;
        assert!(matches!(result, Err(OrchestrationError::InstanceNotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_deploy_marks_error() {
        let root = TempDir::new("botyard").unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        runtime.state.lock().unwrap().failing_creates.insert("botyard-tg-1001".to_string());
        let orchestrator = test_orchestrator(runtime, root.path()).await;

        let result = orchestrator.deploy("inst-1001").await;
        assert!(matches!(result, Err(OrchestrationError::Runtime(RuntimeError::InstanceCreationFailed(_)))));

        let instance = instances::find(&orchestrator.pool, "inst-1001").await.unwrap().unwrap();
        assert_eq!(instance.status, InstanceStatus::Error);
    }

    #[tokio::test]
    async fn test_rollout_persists_new_container_ids() {
        let root = TempDir::new("botyard").unwrap();
        let runtime = Arc::new(FakeRuntime::with_images(&["botyard-base:latest", "botyard-instance:latest"]));
        let orchestrator = test_orchestrator(runtime.clone(), root.path()).await;

        let old = runtime.seed_container("botyard-tg-1001", "inst-1001", true);
        instances::attach_container(&orchestrator.pool, "inst-1001", &old, InstanceStatus::Running).await.unwrap();
        runtime.seed_container("botyard-stray", "inst-9999", true);

        let results = orchestrator.rollout().await.unwrap();

        assert_eq!(results.len(), 2);
        let new_id = match &results.iter().find(|r| r.container_id == old).unwrap().outcome {
            UpdateOutcome::Updated { new_container_id, .. } => new_container_id.clone(),
            other => panic!("unexpected outcome {:?}", other),
        };

        let instance = instances::find(&orchestrator.pool, "inst-1001").await.unwrap().unwrap();
        assert_eq!(instance.container_id, Some(new_id));
        assert_eq!(instance.status, InstanceStatus::Pending);
    }
}
