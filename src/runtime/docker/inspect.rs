use bollard::Docker;
use bollard::models::{ContainerInspectResponse, ContainerStateStatusEnum, HealthStatusEnum};
use bollard::query_parameters::InspectContainerOptions;

use crate::runtime::error::RuntimeError;
use crate::runtime::types::ContainerSnapshot;

fn health_label(status: &HealthStatusEnum) -> Option<String> {
    match status {
        HealthStatusEnum::STARTING => Some("starting".to_string()),
        HealthStatusEnum::HEALTHY => Some("healthy".to_string()),
        HealthStatusEnum::UNHEALTHY => Some("unhealthy".to_string()),
        HealthStatusEnum::NONE => Some("none".to_string()),
        HealthStatusEnum::EMPTY => None,
    }
}

pub(super) fn snapshot_from_inspect(response: &ContainerInspectResponse) -> ContainerSnapshot {
    let state = response.state.clone().unwrap_or_default();

    let health = state.health
        .as_ref()
        .and_then(|h| h.status.as_ref())
        .and_then(health_label);

    // A `["NONE"]` test disables a healthcheck inherited from the image.
    let configured = response.config
        .as_ref()
        .and_then(|c| c.healthcheck.as_ref())
        .and_then(|h| h.test.as_ref())
        .map(|test| !test.is_empty() && test[0] != "NONE")
        .unwrap_or(false);

    let reported = matches!(health.as_deref(), Some("starting" | "healthy" | "unhealthy"));

    ContainerSnapshot {
        running: state.running.unwrap_or(false),
        restarting: state.restarting.unwrap_or(false)
            || state.status == Some(ContainerStateStatusEnum::RESTARTING),
        has_healthcheck: configured || reported,
        health,
        exit_code: state.exit_code.unwrap_or(0),
        restart_count: response.restart_count.unwrap_or(0),
    }
}

pub(super) async fn inspect(docker: &Docker, container_id: &str) -> Result<ContainerSnapshot, RuntimeError> {
    let response = docker
        .inspect_container(container_id, None::<InspectContainerOptions>)
        .await?;

    Ok(snapshot_from_inspect(&response))
}
