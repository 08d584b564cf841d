use bollard::{
    Docker,
    models::{ContainerCreateBody, HostConfig, Mount, MountTypeEnum, RestartPolicy, RestartPolicyNameEnum},
    query_parameters::{
        CreateContainerOptionsBuilder,
        RemoveContainerOptionsBuilder,
        RestartContainerOptionsBuilder,
        StartContainerOptions,
        StopContainerOptionsBuilder,
    },
};
use crate::runtime::error::RuntimeError;
use crate::runtime::types::ContainerSpec;

const STOP_TIMEOUT_SECONDS: i32 = 10;

/// The daemon answers 304 when the container is already in the requested state.
fn already_done(result: Result<(), bollard::errors::Error>) -> Result<(), RuntimeError> {
    match result {
        Err(bollard::errors::Error::DockerResponseServerError { status_code: 304, .. }) => Ok(()),
        other => other.map_err(RuntimeError::from),
    }
}

pub(super) fn container_body(spec: &ContainerSpec) -> ContainerCreateBody {
    let mount = Mount {
        target: Some(spec.mount_path.clone()),
        source: Some(spec.host_path.clone()),
        typ: Some(MountTypeEnum::BIND),
        read_only: Some(false),
        ..Default::default()
    };

    let host_config = HostConfig {
        mounts: Some(vec![mount]),
        memory: Some(spec.memory_bytes),
        nano_cpus: Some(spec.nano_cpus),
        dns: Some(spec.dns.clone()),
        restart_policy: Some(RestartPolicy {
            name: Some(RestartPolicyNameEnum::UNLESS_STOPPED),
            maximum_retry_count: None,
        }),
        ..Default::default()
    };

    ContainerCreateBody {
        image: Some(spec.image.clone()),
        env: Some(spec.env.clone()),
        labels: Some(spec.labels.clone()),
        host_config: Some(host_config),
        ..Default::default()
    }
}

pub(super) async fn create_container(docker: &Docker, spec: &ContainerSpec) -> Result<String, RuntimeError> {
    debug!("Docker create container {} from {}", spec.name, spec.image);

    let options = CreateContainerOptionsBuilder::new()
        .name(&spec.name)
        .build();

    let response = docker.create_container(Some(options), container_body(spec)).await?;

    for warning in response.warnings {
        warn!("Docker create container {}: {}", spec.name, warning);
    }

    Ok(response.id)
}

pub(super) async fn start_container(docker: &Docker, container_id: &str) -> Result<(), RuntimeError> {
    already_done(docker.start_container(container_id, None::<StartContainerOptions>).await)
}

pub(super) async fn stop_container(docker: &Docker, container_id: &str) -> Result<(), RuntimeError> {
    let options = StopContainerOptionsBuilder::new().t(STOP_TIMEOUT_SECONDS).build();

    already_done(docker.stop_container(container_id, Some(options)).await)?;
    debug!("Container {} stopped", container_id);
    Ok(())
}

pub(super) async fn restart_container(docker: &Docker, container_id: &str) -> Result<(), RuntimeError> {
    let options = RestartContainerOptionsBuilder::new().t(STOP_TIMEOUT_SECONDS).build();

    docker.restart_container(container_id, Some(options)).await?;
    Ok(())
}

pub(super) async fn remove_container(docker: &Docker, container_id: &str) -> Result<(), RuntimeError> {
    let options = RemoveContainerOptionsBuilder::new().force(true).build();

    docker.remove_container(container_id, Some(options)).await?;
    info!("Container {} removed", container_id);
    Ok(())
}
