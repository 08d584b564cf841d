use bollard::Docker;
use bollard::models::ContainerSummary;
use bollard::query_parameters::ListContainersOptionsBuilder;
use std::collections::HashMap;

use crate::runtime::error::RuntimeError;
use crate::runtime::types::{ManagedContainer, LABEL_INSTANCE_ID, LABEL_MANAGED};

fn managed_filters() -> HashMap<String, Vec<String>> {
    HashMap::from([
        ("label".to_string(), vec![format!("{}=true", LABEL_MANAGED)]),
    ])
}

fn managed_from_summary(container: ContainerSummary) -> Option<ManagedContainer> {
    let id = container.id?;
    let name = container.names
        .as_ref()
        .and_then(|names| names.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id.chars().take(12).collect());

    Some(ManagedContainer {
        instance_id: container.labels.as_ref().and_then(|l| l.get(LABEL_INSTANCE_ID).cloned()),
        status: container.status.unwrap_or_default(),
        image: container.image.unwrap_or_default(),
        id,
        name,
    })
}

/// Every managed container, stopped ones included.
pub(super) async fn list_managed(docker: &Docker) -> Result<Vec<ManagedContainer>, RuntimeError> {
    let filters = managed_filters();
    let options = ListContainersOptionsBuilder::new().all(true).filters(&filters).build();

    let containers = docker.list_containers(Some(options)).await?;

    Ok(containers.into_iter().filter_map(managed_from_summary).collect())
}
