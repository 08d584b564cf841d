mod build;
mod container;
mod inspect;
mod instances;
mod logs;
mod stats;

use async_trait::async_trait;
use bollard::Docker;
use std::sync::Arc;
use std::time::Duration;

use crate::config::config::Config;
use crate::runtime::error::RuntimeError;
use crate::runtime::runtime::{BuildRequest, ByteStream, ImageBackend, RuntimeInterface};
use crate::runtime::types::{ContainerSnapshot, ContainerSpec, ManagedContainer, RawStats};

impl From<bollard::errors::Error> for RuntimeError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError { status_code: 404, message } => {
                RuntimeError::NotFound(message)
            }
            bollard::errors::Error::DockerResponseServerError { status_code, message } => {
                RuntimeError::Transient(format!("Docker answered {}: {}", status_code, message))
            }
            bollard::errors::Error::IOError { err } => RuntimeError::DaemonUnreachable(err.to_string()),
            bollard::errors::Error::RequestTimeoutError => {
                RuntimeError::DaemonUnreachable("request to the Docker daemon timed out".to_string())
            }
            other => {
                let message = other.to_string();
                if message.contains("connect") || message.contains("No such file or directory") {
                    RuntimeError::DaemonUnreachable(message)
                } else {
                    RuntimeError::Transient(message)
                }
            }
        }
    }
}

pub(crate) fn connect(socket: &str) -> Result<Docker, RuntimeError> {
    Docker::connect_with_unix(socket, 120, bollard::API_DEFAULT_VERSION)
        .map_err(|e| RuntimeError::DaemonUnreachable(format!("Failed to connect to Docker on {}: {}", socket, e)))
}

/// Docker daemon behind both runtime seams.
/// Connects to the configured daemon socket.
pub(crate) fn connect_runtime(config: &Config) -> Result<Arc<DockerRuntime>, RuntimeError> {
    let docker = connect(&config.docker.socket)?;

    Ok(Arc::new(DockerRuntime::new(docker, config)))
}

pub(crate) struct DockerRuntime {
    docker: Docker,
    socket: String,
    build_timeout: Duration,
    log_throttle: Duration,
}

impl DockerRuntime {
    pub(crate) fn new(docker: Docker, config: &Config) -> DockerRuntime {
        DockerRuntime {
            docker,
            socket: config.docker.socket.clone(),
            build_timeout: config.images.build_timeout(),
            log_throttle: config.images.log_throttle(),
        }
    }
}

#[async_trait]
impl RuntimeInterface for DockerRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.docker.ping().await?;
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        container::create_container(&self.docker, spec).await
    }

    async fn start_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        container::start_container(&self.docker, container_id).await
    }

    async fn stop_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        container::stop_container(&self.docker, container_id).await
    }

    async fn restart_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        container::restart_container(&self.docker, container_id).await
    }

    async fn remove_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        container::remove_container(&self.docker, container_id).await
    }

    async fn inspect_container(&self, container_id: &str) -> Result<ContainerSnapshot, RuntimeError> {
        inspect::inspect(&self.docker, container_id).await
    }

    async fn list_managed_containers(&self) -> Result<Vec<ManagedContainer>, RuntimeError> {
        instances::list_managed(&self.docker).await
    }

    async fn raw_logs(&self, container_id: &str, tail: Option<u32>, follow: bool) -> Result<ByteStream, RuntimeError> {
        logs::raw_logs(&self.socket, container_id, tail, follow).await
    }

    async fn stats(&self, container_id: &str) -> Result<RawStats, RuntimeError> {
        stats::sample(&self.docker, container_id).await
    }
}

#[async_trait]
impl ImageBackend for DockerRuntime {
    async fn check_connectivity(&self) -> Result<(), RuntimeError> {
        self.ping().await
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(e) => match RuntimeError::from(e) {
                RuntimeError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn build_image(&self, request: &BuildRequest) -> Result<(), RuntimeError> {
        build::build_image(request, self.build_timeout, self.log_throttle).await
    }
}
