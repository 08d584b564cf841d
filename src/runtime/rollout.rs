use serde::Serialize;
use std::fmt::Display;
use std::future::Future;

use crate::runtime::error::RuntimeError;
use crate::runtime::image::ImageBuilder;
use crate::runtime::manager::InstanceManager;
use crate::runtime::types::InstanceConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub(crate) enum UpdateOutcome {
    Updated { instance_id: String, new_container_id: String },
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct UpdateResult {
    pub(crate) container_id: String,
    pub(crate) container_name: String,
    #[serde(flatten)]
    pub(crate) outcome: UpdateOutcome,
}

/// Rebuilds the instance image, then recreates every managed container on it.
///
/// Containers are handled one at a time. A container whose configuration
/// cannot be found is skipped, and a failing container does not stop the
/// others: every container seen at enumeration gets exactly one result.
pub(crate) async fn rolling_update_all<F, Fut, E>(
    builder: &ImageBuilder,
    manager: &InstanceManager,
    lookup: F,
) -> Result<Vec<UpdateResult>, RuntimeError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Option<InstanceConfig>, E>>,
    E: Display,
{
    builder.force_rebuild_instance_image().await?;

    let containers = manager.list_managed_containers().await?;
    info!("Rolling update over {} managed container(s)", containers.len());

    let mut results = Vec::with_capacity(containers.len());

    for container in containers {
        let outcome = match lookup(container.id.clone()).await {
            Ok(None) => {
                warn!("No instance configuration for container {}, skipping", container.name);
                UpdateOutcome::Skipped
            }
            Err(e) => {
                error!("Configuration lookup for {} failed: {}", container.name, e);
                UpdateOutcome::Failed { error: e.to_string() }
            }
            Ok(Some(config)) => {
                if let Err(e) = manager.delete_instance(&container.id).await {
                    debug!("Removing old container {} failed: {}", container.name, e);
                }

                match manager.create_instance(&config).await {
                    Ok(created) => {
                        info!("Container {} recreated as {}", container.name, created.container_id);
                        UpdateOutcome::Updated {
                            instance_id: config.instance_id,
                            new_container_id: created.container_id,
                        }
                    }
                    Err(e) => {
                        error!("Recreating container {} failed: {}", container.name, e);
                        UpdateOutcome::Failed { error: e.to_string() }
                    }
                }
            }
        };

        results.push(UpdateResult {
            container_id: container.id,
            container_name: container.name,
            outcome,
        });
    }

    Ok(results)
}
